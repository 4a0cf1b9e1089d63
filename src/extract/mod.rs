//! Reading the language model's reply.
//!
//! The reply is untrusted text: [`parse_reply`] turns it into JSON after
//! stripping stray code fences, and [`interpret_reply`] checks it against
//! the extraction contract.

mod fields;
mod reply;

pub use reply::{
    interpret_reply, parse_reply, strip_code_fences, ModelReply, ParseError, RecipeDraft,
};
