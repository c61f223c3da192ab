/*!
 * The three-stage generation pipeline.
 *
 * A job moves through character extraction, visual-prompt synthesis, and
 * batched scene generation; each stage consumes the previous stage's
 * validated artifact. The executor owns the job state machine, `batch`
 * owns segment chunking and the injected sleep dependency, and `prompts`
 * builds the stage prompts.
 */

pub mod batch;
pub mod executor;
pub mod prompts;

pub use batch::{RecordingSleeper, Sleeper, TokioSleeper, chunk_segments};
pub use executor::PipelineExecutor;
