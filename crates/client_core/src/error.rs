use shared::{
    domain::ProductId,
    error::{ErrorCode, UserNotice},
};
use thiserror::Error;

/// Why the catalog could not be loaded. Every variant degrades the gate to an
/// empty catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogFetchError {
    #[error("catalog fetch timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error("catalog fetch failed: {0}")]
    Network(String),
    #[error("catalog document could not be decoded: {0}")]
    Decode(String),
}

impl CatalogFetchError {
    pub fn from_transport(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            CatalogFetchError::Timeout {
                after_ms: timeout_ms,
            }
        } else if err.is_decode() {
            CatalogFetchError::Decode(err.to_string())
        } else {
            CatalogFetchError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompareError {
    #[error("comparison is limited to {capacity} products")]
    CapacityExceeded { capacity: usize },
    #[error("no products selected for comparison")]
    NothingSelected,
}

impl CompareError {
    pub fn notice(&self) -> UserNotice {
        match self {
            CompareError::CapacityExceeded { capacity } => UserNotice::rejected(
                ErrorCode::CapacityExceeded,
                format!("You can only compare up to {capacity} laptops at once"),
            ),
            CompareError::NothingSelected => UserNotice::rejected(
                ErrorCode::Validation,
                "Please select products to compare",
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),
}

impl ListingError {
    pub fn notice(&self) -> UserNotice {
        match self {
            ListingError::ProductNotFound(_) => {
                UserNotice::rejected(ErrorCode::NotFound, "Product not found")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum CartError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),
    #[error("cart is empty")]
    EmptyCart,
    #[error("login required before checkout")]
    LoginRequired,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CartError {
    pub fn notice(&self) -> UserNotice {
        match self {
            CartError::ProductNotFound(_) => {
                UserNotice::rejected(ErrorCode::NotFound, "Product not found")
            }
            CartError::EmptyCart => {
                UserNotice::rejected(ErrorCode::Validation, "Your cart is empty!")
            }
            CartError::LoginRequired => UserNotice::rejected(
                ErrorCode::Unauthorized,
                "Please login to proceed with checkout.",
            ),
            CartError::Storage(_) => storage_notice(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Email,
    Password,
    ConfirmPassword,
    Subject,
    Message,
}

impl FormField {
    pub fn missing_message(self) -> &'static str {
        match self {
            FormField::Name => "Please enter your full name.",
            FormField::Email => "Please enter your email.",
            FormField::Password => "Please enter a password.",
            FormField::ConfirmPassword => "Please confirm your password.",
            FormField::Subject => "Please enter a subject.",
            FormField::Message => "Please enter a message.",
        }
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("missing required fields: {0:?}")]
    MissingFields(Vec<FormField>),
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password shorter than {min} characters")]
    PasswordTooShort { min: usize },
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("email and password are required")]
    MissingCredentials,
    #[error("email or password is incorrect")]
    InvalidCredentials,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl AccountError {
    pub fn notice(&self) -> UserNotice {
        let (code, message) = match self {
            AccountError::MissingFields(_) => (ErrorCode::Validation, "Please fill all fields!".into()),
            AccountError::PasswordMismatch => {
                (ErrorCode::Validation, "Passwords do not match!".into())
            }
            AccountError::PasswordTooShort { min } => (
                ErrorCode::Validation,
                format!("Password must be at least {min} characters."),
            ),
            AccountError::EmailTaken => (
                ErrorCode::Conflict,
                "An account with this email already exists.".into(),
            ),
            AccountError::MissingCredentials => {
                (ErrorCode::Validation, "Please enter valid credentials!".into())
            }
            AccountError::InvalidCredentials => {
                (ErrorCode::Unauthorized, "Incorrect email or password.".into())
            }
            AccountError::Storage(_) => return storage_notice(),
        };
        UserNotice::rejected(code, message)
    }
}

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("email address required")]
    EmailRequired,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("email already subscribed")]
    AlreadySubscribed,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl NewsletterError {
    pub fn notice(&self) -> UserNotice {
        match self {
            NewsletterError::EmailRequired => UserNotice::rejected(
                ErrorCode::Validation,
                "Please enter your email address.",
            ),
            NewsletterError::InvalidEmail => UserNotice::rejected(
                ErrorCode::Validation,
                "Please enter a valid email address.",
            ),
            NewsletterError::AlreadySubscribed => UserNotice::rejected(
                ErrorCode::Conflict,
                "This email is already subscribed to our newsletter.",
            ),
            NewsletterError::Storage(_) => storage_notice(),
        }
    }
}

/// Failure reported by the email relay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("email delivery failed (status {status:?}): {text}")]
pub struct EmailDeliveryError {
    pub status: Option<u16>,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("missing required fields: {0:?}")]
    MissingFields(Vec<FormField>),
    #[error("invalid email address")]
    InvalidEmail,
    #[error(transparent)]
    Delivery(#[from] EmailDeliveryError),
}

impl ContactError {
    pub fn notice(&self) -> UserNotice {
        match self {
            ContactError::MissingFields(_) => UserNotice::rejected(
                ErrorCode::Validation,
                "Please fill in all fields before submitting.",
            ),
            ContactError::InvalidEmail => UserNotice::rejected(
                ErrorCode::Validation,
                "Please enter a valid email address.",
            ),
            ContactError::Delivery(err) => {
                let message = match err.status {
                    Some(412) => {
                        "Email service authentication failed. Please try again later.".to_string()
                    }
                    Some(400) => {
                        "Invalid email data. Please check your inputs and try again.".to_string()
                    }
                    _ if !err.text.is_empty() => format!("Error: {}", err.text),
                    _ => "Sorry, there was an error sending your message.".to_string(),
                };
                UserNotice::rejected(ErrorCode::Unavailable, message)
            }
        }
    }
}

fn storage_notice() -> UserNotice {
    UserNotice::rejected(
        ErrorCode::Internal,
        "Something went wrong saving your changes.",
    )
}
