pub mod analysis;
pub mod dialogue;

pub use analysis::{AnalysisOrchestrator, AnalysisOutcome, AnalysisSource};
pub use dialogue::{DialogueOrchestrator, DialogueSettings, DialogueSink, TurnHandle, TurnOutcome};
