pub mod config;
pub mod groq;
pub mod llm;
pub mod models;
pub mod secrets;
pub mod telemetry;

/**
 * \brief SDK prelude, re-exporting the commonly used modules.
 */
pub mod prelude {
    pub use crate::config;
    pub use crate::groq;
    pub use crate::llm;
    pub use crate::models;
    pub use crate::secrets;
    pub use crate::telemetry;
}
