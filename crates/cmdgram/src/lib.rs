//! Declarative command-line grammars.
//!
//! Declare flags, positional arguments and nested commands against typed
//! value slots, then hand the engine an argument vector:
//!
//! ```rust,ignore
//! use cmdgram::{Application, ParseOutcome};
//!
//! let mut app = Application::new("chat", "A command-line chat client.");
//! let debug = app.flag("debug", "Enable debug mode.").short('d').bool();
//! let mut post = app.command("post", "Post a message to a channel.");
//! let channel = post.arg("channel", "Channel to post to.").required().string();
//! let text = post.arg("text", "Text to post.").strings();
//!
//! match app.parse(&["post", "--debug", "#general", "hello", "world"])? {
//!     ParseOutcome::Command(path) => assert_eq!(path, "post"),
//!     ParseOutcome::Help { command } => print!("{}", cmdgram::usage::render(&app.model(), &command)?),
//!     ParseOutcome::Version(v) => println!("{v}"),
//!     ParseOutcome::Exit(code) => std::process::exit(code),
//! }
//! assert!(debug.get());
//! assert_eq!(channel.get(), "#general");
//! assert_eq!(text.get(), vec!["hello", "world"]);
//! ```
//!
//! Parsing runs in two halves. The matcher walks the tokens against the
//! grammar and records what it saw, without touching any slot. The pipeline
//! then resets every slot, applies defaults, assigns values, runs
//! validators and finally dispatches actions.

pub mod app;
pub mod arg;
pub mod command;
pub mod context;
pub mod env;
pub mod error;
pub mod flag;
mod matcher;
pub mod model;
mod pipeline;
pub mod token;
pub mod usage;
pub mod value;

pub use app::{Application, ParseOutcome};
pub use arg::ArgClause;
pub use command::{CommandClause, CommandId};
pub use context::{Element, Flow, ParseContext, ScopeId};
pub use env::{Environment, ProcessEnv};
pub use error::{GrammarError, ParseError, ParseResult};
pub use flag::FlagClause;
pub use model::ApplicationModel;
pub use value::{Slot, Value};
