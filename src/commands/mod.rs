pub(crate) mod expect;
mod match_line;
mod prompt;
mod read_line;
mod send_input;
mod show;
mod wait;

pub use expect::Expect;
pub use match_line::MatchLine;
pub use prompt::UniquePrompt;
pub use read_line::ReadLine;
pub use send_input::SendInput;
pub use show::Show;
pub use wait::Wait;
