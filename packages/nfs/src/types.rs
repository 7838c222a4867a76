#![allow(non_camel_case_types)]

use crate::xdr::{self, Decoder, Encoder, FromXdr, ToXdr};
use bytes::Bytes;
use num::{FromPrimitive as _, ToPrimitive as _};
use std::io::Write;

pub const NFS4_FHSIZE: usize = 128;
pub const NFS4_OTHER_SIZE: usize = 12;
pub const NFS4_MAXNAMLEN: usize = 255;

/// The server epoch in the high 32 bits followed by a per-server client counter.
pub type clientid4 = u64;

pub const FH4_PERSISTENT: u32 = 0x0000_0000;

pub const SET_TO_SERVER_TIME4: u32 = 0;
pub const SET_TO_CLIENT_TIME4: u32 = 1;

pub const FATTR4_SUPPORTED_ATTRS: u32 = 0;
pub const FATTR4_TYPE: u32 = 1;
pub const FATTR4_FH_EXPIRE_TYPE: u32 = 2;
pub const FATTR4_CHANGE: u32 = 3;
pub const FATTR4_SIZE: u32 = 4;
pub const FATTR4_LINK_SUPPORT: u32 = 5;
pub const FATTR4_SYMLINK_SUPPORT: u32 = 6;
pub const FATTR4_NAMED_ATTR: u32 = 7;
pub const FATTR4_FSID: u32 = 8;
pub const FATTR4_UNIQUE_HANDLES: u32 = 9;
pub const FATTR4_LEASE_TIME: u32 = 10;
pub const FATTR4_RDATTR_ERROR: u32 = 11;
pub const FATTR4_ACL: u32 = 12;
pub const FATTR4_ACLSUPPORT: u32 = 13;
pub const FATTR4_ARCHIVE: u32 = 14;
pub const FATTR4_CANSETTIME: u32 = 15;
pub const FATTR4_CASE_INSENSITIVE: u32 = 16;
pub const FATTR4_CASE_PRESERVING: u32 = 17;
pub const FATTR4_CHOWN_RESTRICTED: u32 = 18;
pub const FATTR4_FILEHANDLE: u32 = 19;
pub const FATTR4_FILEID: u32 = 20;
pub const FATTR4_FILES_AVAIL: u32 = 21;
pub const FATTR4_FILES_FREE: u32 = 22;
pub const FATTR4_FILES_TOTAL: u32 = 23;
pub const FATTR4_FS_LOCATIONS: u32 = 24;
pub const FATTR4_HIDDEN: u32 = 25;
pub const FATTR4_HOMOGENEOUS: u32 = 26;
pub const FATTR4_MAXFILESIZE: u32 = 27;
pub const FATTR4_MAXLINK: u32 = 28;
pub const FATTR4_MAXNAME: u32 = 29;
pub const FATTR4_MAXREAD: u32 = 30;
pub const FATTR4_MAXWRITE: u32 = 31;
pub const FATTR4_MIMETYPE: u32 = 32;
pub const FATTR4_MODE: u32 = 33;
pub const FATTR4_NO_TRUNC: u32 = 34;
pub const FATTR4_NUMLINKS: u32 = 35;
pub const FATTR4_OWNER: u32 = 36;
pub const FATTR4_OWNER_GROUP: u32 = 37;
pub const FATTR4_QUOTA_AVAIL_HARD: u32 = 38;
pub const FATTR4_QUOTA_AVAIL_SOFT: u32 = 39;
pub const FATTR4_QUOTA_USED: u32 = 40;
pub const FATTR4_RAWDEV: u32 = 41;
pub const FATTR4_SPACE_AVAIL: u32 = 42;
pub const FATTR4_SPACE_FREE: u32 = 43;
pub const FATTR4_SPACE_TOTAL: u32 = 44;
pub const FATTR4_SPACE_USED: u32 = 45;
pub const FATTR4_SYSTEM: u32 = 46;
pub const FATTR4_TIME_ACCESS: u32 = 47;
pub const FATTR4_TIME_ACCESS_SET: u32 = 48;
pub const FATTR4_TIME_BACKUP: u32 = 49;
pub const FATTR4_TIME_CREATE: u32 = 50;
pub const FATTR4_TIME_DELTA: u32 = 51;
pub const FATTR4_TIME_METADATA: u32 = 52;
pub const FATTR4_TIME_MODIFY: u32 = 53;
pub const FATTR4_TIME_MODIFY_SET: u32 = 54;
pub const FATTR4_MOUNTED_ON_FILEID: u32 = 55;
pub const FATTR4_DIR_NOTIF_DELAY: u32 = 56;
pub const FATTR4_DIRENT_NOTIF_DELAY: u32 = 57;
pub const FATTR4_DACL: u32 = 58;
pub const FATTR4_SACL: u32 = 59;
pub const FATTR4_CHANGE_POLICY: u32 = 60;
pub const FATTR4_FS_STATUS: u32 = 61;
pub const FATTR4_FS_LAYOUT_TYPES: u32 = 62;
pub const FATTR4_LAYOUT_HINT: u32 = 63;
pub const FATTR4_LAYOUT_TYPES: u32 = 64;
pub const FATTR4_LAYOUT_BLKSIZE: u32 = 65;
pub const FATTR4_LAYOUT_ALIGNMENT: u32 = 66;
pub const FATTR4_FS_LOCATIONS_INFO: u32 = 67;
pub const FATTR4_MDSTHRESHOLD: u32 = 68;
pub const FATTR4_RETENTION_GET: u32 = 69;
pub const FATTR4_RETENTION_SET: u32 = 70;
pub const FATTR4_RETENTEVT_GET: u32 = 71;
pub const FATTR4_RETENTEVT_SET: u32 = 72;
pub const FATTR4_RETENTION_HOLD: u32 = 73;
pub const FATTR4_MODE_SET_MASKED: u32 = 74;
pub const FATTR4_SUPPATTR_EXCLCREAT: u32 = 75;
pub const FATTR4_FS_CHARSET_CAP: u32 = 76;
pub const FATTR4_CLONE_BLKSIZE: u32 = 77;
pub const FATTR4_SPACE_FREED: u32 = 78;
pub const FATTR4_CHANGE_ATTR_TYPE: u32 = 79;
pub const FATTR4_SEC_LABEL: u32 = 80;

pub const ACE4_ACCESS_ALLOWED_ACE_TYPE: u32 = 0x0000_0000;
pub const ACE4_ACCESS_DENIED_ACE_TYPE: u32 = 0x0000_0001;
pub const ACE4_SYSTEM_AUDIT_ACE_TYPE: u32 = 0x0000_0002;
pub const ACE4_SYSTEM_ALARM_ACE_TYPE: u32 = 0x0000_0003;

pub const ACE4_FILE_INHERIT_ACE: u32 = 0x0000_0001;
pub const ACE4_DIRECTORY_INHERIT_ACE: u32 = 0x0000_0002;
pub const ACE4_NO_PROPAGATE_INHERIT_ACE: u32 = 0x0000_0004;
pub const ACE4_INHERIT_ONLY_ACE: u32 = 0x0000_0008;
pub const ACE4_SUCCESSFUL_ACCESS_ACE_FLAG: u32 = 0x0000_0010;
pub const ACE4_FAILED_ACCESS_ACE_FLAG: u32 = 0x0000_0020;
pub const ACE4_IDENTIFIER_GROUP: u32 = 0x0000_0040;
pub const ACE4_INHERITED_ACE: u32 = 0x0000_0080;

pub const ACE4_READ_DATA: u32 = 0x0000_0001;
pub const ACE4_WRITE_DATA: u32 = 0x0000_0002;
pub const ACE4_APPEND_DATA: u32 = 0x0000_0004;
pub const ACE4_READ_NAMED_ATTRS: u32 = 0x0000_0008;
pub const ACE4_WRITE_NAMED_ATTRS: u32 = 0x0000_0010;
pub const ACE4_EXECUTE: u32 = 0x0000_0020;
pub const ACE4_DELETE_CHILD: u32 = 0x0000_0040;
pub const ACE4_READ_ATTRIBUTES: u32 = 0x0000_0080;
pub const ACE4_WRITE_ATTRIBUTES: u32 = 0x0000_0100;
pub const ACE4_DELETE: u32 = 0x0001_0000;
pub const ACE4_READ_ACL: u32 = 0x0002_0000;
pub const ACE4_WRITE_ACL: u32 = 0x0004_0000;
pub const ACE4_WRITE_OWNER: u32 = 0x0008_0000;
pub const ACE4_SYNCHRONIZE: u32 = 0x0010_0000;

pub const ACL4_SUPPORT_ALLOW_ACL: u32 = 0x0000_0001;
pub const ACL4_SUPPORT_DENY_ACL: u32 = 0x0000_0002;
pub const ACL4_SUPPORT_AUDIT_ACL: u32 = 0x0000_0004;
pub const ACL4_SUPPORT_ALARM_ACL: u32 = 0x0000_0008;

pub const MODE4_SUID: u32 = 0x800;
pub const MODE4_SGID: u32 = 0x400;
pub const MODE4_SVTX: u32 = 0x200;
pub const MODE4_RUSR: u32 = 0x100;
pub const MODE4_WUSR: u32 = 0x080;
pub const MODE4_XUSR: u32 = 0x040;
pub const MODE4_RGRP: u32 = 0x020;
pub const MODE4_WGRP: u32 = 0x010;
pub const MODE4_XGRP: u32 = 0x008;
pub const MODE4_ROTH: u32 = 0x004;
pub const MODE4_WOTH: u32 = 0x002;
pub const MODE4_XOTH: u32 = 0x001;

pub const LAYOUT4_NFSV4_1_FILES: u32 = 0x1;

#[derive(
	Clone, Copy, Debug, PartialEq, Eq, Hash, num_derive::FromPrimitive, num_derive::ToPrimitive,
)]
#[repr(u32)]
pub enum nfsstat4 {
	NFS4_OK = 0,
	NFS4ERR_PERM = 1,
	NFS4ERR_NOENT = 2,
	NFS4ERR_IO = 5,
	NFS4ERR_NXIO = 6,
	NFS4ERR_ACCESS = 13,
	NFS4ERR_EXIST = 17,
	NFS4ERR_XDEV = 18,
	NFS4ERR_NOTDIR = 20,
	NFS4ERR_ISDIR = 21,
	NFS4ERR_INVAL = 22,
	NFS4ERR_FBIG = 27,
	NFS4ERR_NOSPC = 28,
	NFS4ERR_ROFS = 30,
	NFS4ERR_MLINK = 31,
	NFS4ERR_NAMETOOLONG = 63,
	NFS4ERR_NOTEMPTY = 66,
	NFS4ERR_DQUOT = 69,
	NFS4ERR_STALE = 70,
	NFS4ERR_BADHANDLE = 10001,
	NFS4ERR_BAD_COOKIE = 10003,
	NFS4ERR_NOTSUPP = 10004,
	NFS4ERR_TOOSMALL = 10005,
	NFS4ERR_SERVERFAULT = 10006,
	NFS4ERR_BADTYPE = 10007,
	NFS4ERR_DELAY = 10008,
	NFS4ERR_SAME = 10009,
	NFS4ERR_DENIED = 10010,
	NFS4ERR_EXPIRED = 10011,
	NFS4ERR_LOCKED = 10012,
	NFS4ERR_GRACE = 10013,
	NFS4ERR_FHEXPIRED = 10014,
	NFS4ERR_SHARE_DENIED = 10015,
	NFS4ERR_WRONGSEC = 10016,
	NFS4ERR_CLID_INUSE = 10017,
	NFS4ERR_RESOURCE = 10018,
	NFS4ERR_MOVED = 10019,
	NFS4ERR_NOFILEHANDLE = 10020,
	NFS4ERR_MINOR_VERS_MISMATCH = 10021,
	NFS4ERR_STALE_CLIENTID = 10022,
	NFS4ERR_STALE_STATEID = 10023,
	NFS4ERR_OLD_STATEID = 10024,
	NFS4ERR_BAD_STATEID = 10025,
	NFS4ERR_BAD_SEQID = 10026,
	NFS4ERR_NOT_SAME = 10027,
	NFS4ERR_LOCK_RANGE = 10028,
	NFS4ERR_SYMLINK = 10029,
	NFS4ERR_RESTOREFH = 10030,
	NFS4ERR_LEASE_MOVED = 10031,
	NFS4ERR_ATTRNOTSUPP = 10032,
	NFS4ERR_NO_GRACE = 10033,
	NFS4ERR_RECLAIM_BAD = 10034,
	NFS4ERR_RECLAIM_CONFLICT = 10035,
	NFS4ERR_BADXDR = 10036,
	NFS4ERR_LOCKS_HELD = 10037,
	NFS4ERR_OPENMODE = 10038,
	NFS4ERR_BADOWNER = 10039,
	NFS4ERR_BADCHAR = 10040,
	NFS4ERR_BADNAME = 10041,
	NFS4ERR_BAD_RANGE = 10042,
	NFS4ERR_LOCK_NOTSUPP = 10043,
	NFS4ERR_OP_ILLEGAL = 10044,
	NFS4ERR_DEADLOCK = 10045,
	NFS4ERR_FILE_OPEN = 10046,
	NFS4ERR_ADMIN_REVOKED = 10047,
	NFS4ERR_CB_PATH_DOWN = 10048,
	NFS4ERR_BADIOMODE = 10049,
	NFS4ERR_BADLAYOUT = 10050,
	NFS4ERR_BAD_SESSION_DIGEST = 10051,
	NFS4ERR_BADSESSION = 10052,
	NFS4ERR_BADSLOT = 10053,
	NFS4ERR_COMPLETE_ALREADY = 10054,
	NFS4ERR_CONN_NOT_BOUND_TO_SESSION = 10055,
	NFS4ERR_DELEG_ALREADY_WANTED = 10056,
	NFS4ERR_BACK_CHAN_BUSY = 10057,
	NFS4ERR_LAYOUTTRYLATER = 10058,
	NFS4ERR_LAYOUTUNAVAILABLE = 10059,
	NFS4ERR_NOMATCHING_LAYOUT = 10060,
	NFS4ERR_RECALLCONFLICT = 10061,
	NFS4ERR_UNKNOWN_LAYOUTTYPE = 10062,
	NFS4ERR_SEQ_MISORDERED = 10063,
	NFS4ERR_SEQUENCE_POS = 10064,
	NFS4ERR_REQ_TOO_BIG = 10065,
	NFS4ERR_REP_TOO_BIG = 10066,
	NFS4ERR_REP_TOO_BIG_TO_CACHE = 10067,
	NFS4ERR_RETRY_UNCACHED_REP = 10068,
	NFS4ERR_UNSAFE_COMPOUND = 10069,
	NFS4ERR_TOO_MANY_OPS = 10070,
	NFS4ERR_OP_NOT_IN_SESSION = 10071,
	NFS4ERR_HASH_ALG_UNSUPP = 10072,
	NFS4ERR_CLIENTID_BUSY = 10074,
	NFS4ERR_PNFS_IO_HOLE = 10075,
	NFS4ERR_SEQ_FALSE_RETRY = 10076,
	NFS4ERR_BAD_HIGH_SLOT = 10077,
	NFS4ERR_DEADSESSION = 10078,
	NFS4ERR_ENCR_ALG_UNSUPP = 10079,
	NFS4ERR_PNFS_NO_LAYOUT = 10080,
	NFS4ERR_NOT_ONLY_OP = 10081,
	NFS4ERR_WRONG_CRED = 10082,
	NFS4ERR_WRONG_TYPE = 10083,
	NFS4ERR_DIRDELEG_UNAVAIL = 10084,
	NFS4ERR_REJECT_DELEG = 10085,
	NFS4ERR_RETURNCONFLICT = 10086,
	NFS4ERR_DELEG_REVOKED = 10087,

	/// Never sent on the wire. Tells the caller to replay its cached response.
	NFS4ERR_REPLAY = 11001,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct stateid4 {
	pub seqid: u32,
	pub other: [u8; NFS4_OTHER_SIZE],
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct bitmap4(pub Vec<u32>);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct fattr4 {
	pub attrmask: bitmap4,
	pub attr_vals: Vec<u8>,
}

#[derive(
	Clone, Copy, Debug, PartialEq, Eq, Hash, num_derive::FromPrimitive, num_derive::ToPrimitive,
)]
#[repr(u32)]
pub enum nfs_ftype4 {
	NF4REG = 1,
	NF4DIR = 2,
	NF4BLK = 3,
	NF4CHR = 4,
	NF4LNK = 5,
	NF4SOCK = 6,
	NF4FIFO = 7,
	NF4ATTRDIR = 8,
	NF4NAMEDATTR = 9,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct nfs_fh4(pub Bytes);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct nfstime4 {
	pub seconds: i64,
	pub nseconds: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct fsid4 {
	pub major: u64,
	pub minor: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct specdata4 {
	pub specdata1: u32,
	pub specdata2: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct nfsace4 {
	pub type_: u32,
	pub flag: u32,
	pub access_mask: u32,
	pub who: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct pathname4(pub Vec<String>);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct fs_location4 {
	pub server: Vec<String>,
	pub rootpath: pathname4,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct fs_locations4 {
	pub fs_root: pathname4,
	pub locations: Vec<fs_location4>,
}

impl nfsstat4 {
	#[must_use]
	pub fn is_ok(self) -> bool {
		self == Self::NFS4_OK
	}
}

impl From<xdr::Error> for nfsstat4 {
	fn from(_: xdr::Error) -> Self {
		Self::NFS4ERR_BADXDR
	}
}

impl std::fmt::Display for nfsstat4 {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{self:?}")
	}
}

impl bitmap4 {
	#[must_use]
	pub fn new() -> Self {
		Self(Vec::new())
	}

	#[must_use]
	pub fn from_attrs(attrs: &[u32]) -> Self {
		let mut bitmap = Self::new();
		for attr in attrs {
			bitmap.set(*attr);
		}
		bitmap
	}

	pub fn set(&mut self, attr: u32) {
		let word = (attr / 32) as usize;
		if word >= self.0.len() {
			self.0.resize(word + 1, 0);
		}
		self.0[word] |= 1 << (attr % 32);
	}

	pub fn clear(&mut self, attr: u32) {
		let word = (attr / 32) as usize;
		if let Some(word) = self.0.get_mut(word) {
			*word &= !(1 << (attr % 32));
		}
	}

	#[must_use]
	pub fn get(&self, attr: u32) -> bool {
		let word = (attr / 32) as usize;
		self.0
			.get(word)
			.is_some_and(|word| word & (1 << (attr % 32)) != 0)
	}

	/// Whether no attribute is set, regardless of the number of words.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.iter().all(|word| *word == 0)
	}

	/// Find the first set attribute at or after `start`.
	#[must_use]
	pub fn next_set_from(&self, start: u32) -> Option<u32> {
		let end = self.0.len().to_u32()?.checked_mul(32)?;
		(start..end).find(|attr| self.get(*attr))
	}

	/// Iterate the set attributes in ascending order.
	pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
		let mut next = self.next_set_from(0);
		std::iter::from_fn(move || {
			let attr = next?;
			next = attr.checked_add(1).and_then(|start| self.next_set_from(start));
			Some(attr)
		})
	}

	#[must_use]
	pub fn intersection(&self, other: &Self) -> Self {
		let words = self
			.0
			.iter()
			.zip(other.0.iter())
			.map(|(a, b)| a & b)
			.collect();
		Self(words)
	}
}

impl nfstime4 {
	#[must_use]
	pub fn now() -> Self {
		let now = std::time::SystemTime::now()
			.duration_since(std::time::UNIX_EPOCH)
			.unwrap_or_default();
		Self {
			seconds: now.as_secs().to_i64().unwrap_or(i64::MAX),
			nseconds: now.subsec_nanos(),
		}
	}
}

impl ToXdr for nfsstat4 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), xdr::Error>
	where
		W: Write,
	{
		let value = self
			.to_u32()
			.ok_or_else(|| xdr::Error::Custom("invalid status".to_owned()))?;
		encoder.encode_uint(value)
	}
}

impl FromXdr for nfsstat4 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, xdr::Error> {
		let value = decoder.decode_uint()?;
		Self::from_u32(value).ok_or_else(|| xdr::Error::Custom(format!("invalid status {value}")))
	}
}

impl ToXdr for stateid4 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), xdr::Error>
	where
		W: Write,
	{
		encoder.encode_uint(self.seqid)?;
		encoder.encode_opaque_fixed(&self.other)
	}
}

impl FromXdr for stateid4 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, xdr::Error> {
		let seqid = decoder.decode_uint()?;
		let mut other = [0; NFS4_OTHER_SIZE];
		other.copy_from_slice(decoder.decode_opaque_fixed(NFS4_OTHER_SIZE)?);
		Ok(Self { seqid, other })
	}
}

impl ToXdr for bitmap4 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), xdr::Error>
	where
		W: Write,
	{
		encoder.encode(&self.0)
	}
}

impl FromXdr for bitmap4 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, xdr::Error> {
		Ok(Self(decoder.decode()?))
	}
}

impl ToXdr for fattr4 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), xdr::Error>
	where
		W: Write,
	{
		encoder.encode(&self.attrmask)?;
		encoder.encode_opaque(&self.attr_vals)
	}
}

impl FromXdr for fattr4 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, xdr::Error> {
		let attrmask = decoder.decode()?;
		let attr_vals = decoder.decode_opaque()?.to_vec();
		Ok(Self {
			attrmask,
			attr_vals,
		})
	}
}

impl ToXdr for nfs_ftype4 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), xdr::Error>
	where
		W: Write,
	{
		encoder.encode_uint(*self as u32)
	}
}

impl FromXdr for nfs_ftype4 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, xdr::Error> {
		let value = decoder.decode_uint()?;
		Self::from_u32(value).ok_or_else(|| xdr::Error::Custom(format!("invalid file type {value}")))
	}
}

impl ToXdr for nfs_fh4 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), xdr::Error>
	where
		W: Write,
	{
		if self.0.len() > NFS4_FHSIZE {
			return Err(xdr::Error::TooLong {
				length: self.0.len(),
				max: NFS4_FHSIZE,
			});
		}
		encoder.encode_opaque(&self.0)
	}
}

impl FromXdr for nfs_fh4 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, xdr::Error> {
		let bytes = decoder.decode_opaque_max(NFS4_FHSIZE)?;
		Ok(Self(Bytes::copy_from_slice(bytes)))
	}
}

impl ToXdr for nfstime4 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), xdr::Error>
	where
		W: Write,
	{
		encoder.encode_hyper(self.seconds)?;
		encoder.encode_uint(self.nseconds)
	}
}

impl FromXdr for nfstime4 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, xdr::Error> {
		let seconds = decoder.decode_hyper()?;
		let nseconds = decoder.decode_uint()?;
		Ok(Self { seconds, nseconds })
	}
}

impl ToXdr for fsid4 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), xdr::Error>
	where
		W: Write,
	{
		encoder.encode_uhyper(self.major)?;
		encoder.encode_uhyper(self.minor)
	}
}

impl FromXdr for fsid4 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, xdr::Error> {
		let major = decoder.decode_uhyper()?;
		let minor = decoder.decode_uhyper()?;
		Ok(Self { major, minor })
	}
}

impl ToXdr for specdata4 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), xdr::Error>
	where
		W: Write,
	{
		encoder.encode_uint(self.specdata1)?;
		encoder.encode_uint(self.specdata2)
	}
}

impl FromXdr for specdata4 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, xdr::Error> {
		let [specdata1, specdata2] = decoder.decode_n::<u32, 2>()?;
		Ok(Self {
			specdata1,
			specdata2,
		})
	}
}

impl ToXdr for nfsace4 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), xdr::Error>
	where
		W: Write,
	{
		encoder.encode_uint(self.type_)?;
		encoder.encode_uint(self.flag)?;
		encoder.encode_uint(self.access_mask)?;
		encoder.encode_str(&self.who)
	}
}

impl FromXdr for nfsace4 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, xdr::Error> {
		let type_ = decoder.decode_uint()?;
		let flag = decoder.decode_uint()?;
		let access_mask = decoder.decode_uint()?;
		let who = decoder.decode_opaque_max(NFS4_MAXNAMLEN)?;
		let who = std::str::from_utf8(who)?.to_owned();
		Ok(Self {
			type_,
			flag,
			access_mask,
			who,
		})
	}
}

impl ToXdr for pathname4 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), xdr::Error>
	where
		W: Write,
	{
		encoder.encode(&self.0)
	}
}

impl FromXdr for pathname4 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, xdr::Error> {
		Ok(Self(decoder.decode()?))
	}
}

impl ToXdr for fs_location4 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), xdr::Error>
	where
		W: Write,
	{
		encoder.encode(&self.server)?;
		encoder.encode(&self.rootpath)
	}
}

impl FromXdr for fs_location4 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, xdr::Error> {
		let server = decoder.decode()?;
		let rootpath = decoder.decode()?;
		Ok(Self { server, rootpath })
	}
}

impl ToXdr for fs_locations4 {
	fn encode<W>(&self, encoder: &mut Encoder<W>) -> Result<(), xdr::Error>
	where
		W: Write,
	{
		encoder.encode(&self.fs_root)?;
		encoder.encode(&self.locations)
	}
}

impl FromXdr for fs_locations4 {
	fn decode(decoder: &mut Decoder<'_>) -> Result<Self, xdr::Error> {
		let fs_root = decoder.decode()?;
		let locations = decoder.decode()?;
		Ok(Self { fs_root, locations })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn bitmap() {
		let mut bitmap = bitmap4::new();
		bitmap.set(FATTR4_TYPE);
		bitmap.set(FATTR4_MODE);
		bitmap.set(FATTR4_SEC_LABEL);
		assert_eq!(bitmap.0, vec![0x0000_0002, 0x0000_0002, 0x0001_0000]);
		assert!(bitmap.get(FATTR4_MODE));
		assert!(!bitmap.get(FATTR4_SIZE));
		assert!(!bitmap.get(1000));
		assert_eq!(bitmap.next_set_from(2), Some(FATTR4_MODE));
		assert_eq!(bitmap.next_set_from(34), Some(FATTR4_SEC_LABEL));
		assert_eq!(bitmap.next_set_from(81), None);
		assert_eq!(
			bitmap.iter().collect::<Vec<_>>(),
			vec![FATTR4_TYPE, FATTR4_MODE, FATTR4_SEC_LABEL]
		);
		bitmap.clear(FATTR4_SEC_LABEL);
		bitmap.clear(1000);
		assert_eq!(bitmap.0, vec![0x0000_0002, 0x0000_0002, 0]);
		assert!(!bitmap4(vec![0, 0]).iter().any(|_| true));
		assert!(bitmap4(vec![0, 0]).is_empty());
	}

	#[test]
	fn intersection() {
		let a = bitmap4::from_attrs(&[FATTR4_TYPE, FATTR4_MODE, FATTR4_SEC_LABEL]);
		let b = bitmap4::from_attrs(&[FATTR4_MODE, FATTR4_SIZE]);
		let both = a.intersection(&b);
		assert_eq!(both.iter().collect::<Vec<_>>(), vec![FATTR4_MODE]);
		assert_eq!(both.0.len(), 2);
		assert_eq!(b.intersection(&a), both);
		assert!(a.intersection(&bitmap4::new()).is_empty());
	}

	#[test]
	fn stateid() {
		let stateid = stateid4 {
			seqid: 7,
			other: [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
		};
		let mut buf = Vec::new();
		Encoder::new(&mut buf).encode(&stateid).unwrap();
		assert_eq!(buf.len(), 16);
		assert_eq!(&buf[..4], &[0, 0, 0, 7]);
		let decoded = Decoder::from_bytes(&buf).decode::<stateid4>().unwrap();
		assert_eq!(decoded, stateid);
	}

	#[test]
	fn file_handle_is_bounded() {
		let handle = nfs_fh4(Bytes::from(vec![0; NFS4_FHSIZE + 1]));
		let mut buf = Vec::new();
		assert!(Encoder::new(&mut buf).encode(&handle).is_err());
	}
}
