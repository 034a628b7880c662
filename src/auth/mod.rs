pub mod jwt;
pub mod ownership;
pub mod password;
pub mod pin;

pub use jwt::{Claims, TokenError, TokenIssuer};
pub use ownership::{authorize, Owned};
pub use pin::{LogPinDelivery, PinDelivery};
