pub mod endpoint;
pub mod script;
pub mod session;
pub mod types;

pub use endpoint::{DebugEndpoint, WindowSource, poll_windows};
pub use script::InjectionScript;
pub use session::{Evaluator, InjectionSession, interpret_response};
pub use types::{
    DevtoolsError, DevtoolsResult, EvaluateCommand, EvaluateParams, EvaluationResult,
    WindowDescriptor,
};
