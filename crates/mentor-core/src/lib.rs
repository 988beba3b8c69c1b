pub mod gate;
pub mod intent;
pub mod prompt;
pub mod quiz;
pub mod turn;

pub use gate::*;
pub use intent::*;
pub use prompt::*;
pub use quiz::*;
pub use turn::*;
