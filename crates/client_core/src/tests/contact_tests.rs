use super::*;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use shared::error::ErrorCode;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct RelayState {
    status: StatusCode,
    reply: &'static str,
    received: Arc<Mutex<Vec<EmailSendRequest>>>,
}

async fn relay_send(
    State(state): State<RelayState>,
    Json(request): Json<EmailSendRequest>,
) -> (StatusCode, &'static str) {
    state.received.lock().await.push(request);
    (state.status, state.reply)
}

async fn spawn_relay(
    status: StatusCode,
    reply: &'static str,
) -> anyhow::Result<(String, Arc<Mutex<Vec<EmailSendRequest>>>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = RelayState {
        status,
        reply,
        received: Arc::clone(&received),
    };
    let app = Router::new()
        .route("/api/v1.0/email/send", post(relay_send))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/api/v1.0/email/send"), received))
}

fn desk_for(endpoint: String) -> ContactDesk {
    ContactDesk::new(Arc::new(EmailJsSender::new(EmailJsConfig {
        endpoint,
        service_id: "service_test".into(),
        template_id: "template_test".into(),
        user_id: "public_key".into(),
    })))
}

fn filled_form() -> ContactForm {
    ContactForm {
        name: " Ana ".into(),
        email: "ana@pczone.my".into(),
        subject: "Warranty".into(),
        message: "Is the dock covered?".into(),
    }
}

#[tokio::test]
async fn delivers_trimmed_template_params_to_relay() {
    let (endpoint, received) = spawn_relay(StatusCode::OK, "OK").await.expect("spawn relay");
    let desk = desk_for(endpoint);

    desk.submit(&filled_form()).await.expect("delivered");

    let received = received.lock().await;
    assert_eq!(received.len(), 1);
    let request = &received[0];
    assert_eq!(request.service_id, "service_test");
    assert_eq!(request.template_id, "template_test");
    assert_eq!(request.user_id, "public_key");
    assert_eq!(request.template_params.title, "Warranty");
    assert_eq!(request.template_params.name, "Ana");
}

#[tokio::test]
async fn validation_failures_never_reach_the_relay() {
    let (endpoint, received) = spawn_relay(StatusCode::OK, "OK").await.expect("spawn relay");
    let desk = desk_for(endpoint);

    let mut form = filled_form();
    form.subject = "   ".into();
    form.message.clear();
    match desk.submit(&form).await {
        Err(ContactError::MissingFields(fields)) => {
            assert_eq!(fields, vec![FormField::Subject, FormField::Message]);
        }
        other => panic!("expected missing fields, got {other:?}"),
    }

    let mut form = filled_form();
    form.email = "ana.pczone.my".into();
    assert!(matches!(
        desk.submit(&form).await,
        Err(ContactError::InvalidEmail)
    ));

    assert!(received.lock().await.is_empty());
}

#[tokio::test]
async fn relay_rejections_map_to_user_messages() {
    let (endpoint, _received) = spawn_relay(StatusCode::PRECONDITION_FAILED, "bad key")
        .await
        .expect("spawn relay");
    let err = desk_for(endpoint)
        .submit(&filled_form())
        .await
        .expect_err("412 must fail");
    let notice = err.notice();
    assert_eq!(notice.code, Some(ErrorCode::Unavailable));
    assert_eq!(
        notice.message,
        "Email service authentication failed. Please try again later."
    );

    let (endpoint, _received) = spawn_relay(StatusCode::BAD_REQUEST, "missing field")
        .await
        .expect("spawn relay");
    let err = desk_for(endpoint)
        .submit(&filled_form())
        .await
        .expect_err("400 must fail");
    assert_eq!(
        err.notice().message,
        "Invalid email data. Please check your inputs and try again."
    );

    let (endpoint, _received) = spawn_relay(StatusCode::SERVICE_UNAVAILABLE, "quota reached")
        .await
        .expect("spawn relay");
    let err = desk_for(endpoint)
        .submit(&filled_form())
        .await
        .expect_err("503 must fail");
    assert_eq!(err.notice().message, "Error: quota reached");
}
