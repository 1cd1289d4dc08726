mod sompi;

pub mod op;

pub use sompi::{Sompi, SompiConversionError, KAS_CURRENCY_CODE, SOMPI_PER_KAS};
