// canvas-common: wire types shared by the sync core and the CLI

pub mod protocol;
pub mod types;
