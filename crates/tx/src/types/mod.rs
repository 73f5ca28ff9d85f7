//! Holds transaction component types: scripts, inputs, outputs and the sighash type.

pub mod script;
pub mod sighash;
pub mod txin;
pub mod txout;

pub use script::*;
pub use sighash::*;
pub use txin::*;
pub use txout::*;
