pub mod courtroom;
pub mod icons;
pub mod report;

pub use courtroom::TerminalSink;
