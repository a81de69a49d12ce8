//! Matrix decomposition.
//!
//! - [`Nmf`]: Non-negative Matrix Factorization (coordinate descent)
//! - [`Init`]: factor initialisation strategies (random, NNDSVD family)

mod init;
mod nmf;

pub use init::Init;
pub use nmf::Nmf;
