pub use self::{
	attr::{AttributeCodec, Attributes, Comparison, Context, Decoded, EncodeArgs},
	config::Config,
	export::{Export, FsInfo},
	state::{Compound, State, StateTable, Validated},
};

pub mod attr;
pub mod client;
pub mod config;
pub mod export;
pub mod name;
pub mod state;
pub mod types;
pub mod xdr;
