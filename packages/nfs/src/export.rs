use crate::types::{fs_locations4, fsid4, nfsstat4};

/// The export and filesystem queries the attribute codec needs while encoding and decoding.
pub trait Export: Send + Sync {
	fn supports(&self, capability: Capability) -> bool;

	/// The ACL4_SUPPORT_* flags.
	fn acl_support(&self) -> u32;

	fn max_file_size(&self) -> u64;

	fn max_link(&self) -> u32;

	fn max_name_len(&self) -> u32;

	fn max_read(&self) -> u64;

	fn max_write(&self) -> u64;

	/// The fsid configured for the export. When absent, the object's fsid is reported.
	fn fsid(&self) -> Option<fsid4>;

	fn layout_types(&self) -> Vec<u32>;

	fn layout_blocksize(&self) -> u32;

	/// The locations of the filesystem rooted at a directory, if it has moved or is replicated.
	fn fs_locations(&self) -> Option<fs_locations4>;

	fn statfs(&self) -> Result<FsInfo, nfsstat4>;

	fn name_to_uid(&self, name: &str) -> Option<u32>;

	fn name_to_gid(&self, name: &str) -> Option<u32>;

	fn uid_to_name(&self, uid: u32) -> Option<String>;

	fn gid_to_name(&self, gid: u32) -> Option<String>;

	/// The uid that unmapped owner names map to. When absent, unmapped names are rejected.
	fn anonymous_uid(&self) -> Option<u32>;

	/// The gid that unmapped group names map to. When absent, unmapped names are rejected.
	fn anonymous_gid(&self) -> Option<u32>;
}

/// The filesystem capabilities reported by the boolean attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
	LinkSupport,
	SymlinkSupport,
	NamedAttr,
	UniqueHandles,
	CanSetTime,
	CaseInsensitive,
	CasePreserving,
	ChownRestricted,
	Homogeneous,
	NoTrunc,
}

/// Space and file counts for the filesystem holding an object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct FsInfo {
	pub total_bytes: u64,
	pub free_bytes: u64,
	pub avail_bytes: u64,
	pub total_files: u64,
	pub free_files: u64,
	pub avail_files: u64,
}

impl FsInfo {
	/// The values reported when attributes are encoded without an export.
	pub const PROBE: Self = Self {
		total_bytes: 1_024_000,
		free_bytes: 512_000,
		avail_bytes: 512_000,
		total_files: 512,
		free_files: 512,
		avail_files: 512,
	};
}
