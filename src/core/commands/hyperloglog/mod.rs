// src/core/commands/hyperloglog/mod.rs

pub mod pfadd;
pub mod pfcount;
pub mod pfmerge;

pub use self::pfadd::PfAdd;
pub use self::pfcount::PfCount;
pub use self::pfmerge::PfMerge;
