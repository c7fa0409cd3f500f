pub mod distributions;
pub mod fingerprint;
pub mod text;
pub mod time;
pub mod validation;
