pub mod codec;
pub mod ebr;
pub mod fdisk;
pub mod file_disk;
pub mod mbr;
pub mod types;

pub use codec::Record;
pub use ebr::{ChainNode, Ebr, EbrChain};
pub use fdisk::PartitionRequest;
pub use file_disk::{disk_name, FileDisk};
pub use mbr::{FreeSlot, Mbr, Partition};
pub use types::{Fit, PartitionKind};
