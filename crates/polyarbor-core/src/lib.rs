pub mod clock;
pub mod constants;
pub mod engine;
pub mod error;
pub mod layer;
pub mod mixer;
pub mod pattern;
pub mod scheduler;
pub mod visual;
pub mod voice;

pub use clock::*;
pub use constants::*;
pub use engine::*;
pub use error::*;
pub use layer::*;
pub use mixer::*;
pub use pattern::*;
pub use scheduler::*;
pub use visual::*;
pub use voice::*;
