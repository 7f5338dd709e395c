mod helpers;
mod money;
mod secret;

pub use helpers::parse_boolean_flag;
pub use money::{Money, MoneyConversionError, EUR_CURRENCY_CODE};
pub use secret::Secret;
