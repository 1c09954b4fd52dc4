pub mod model_refresh;

pub use model_refresh::{start_model_refresh, ModelRefreshConfig};
