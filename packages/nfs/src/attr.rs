use crate::{
	config::Config,
	export::{Export, FsInfo},
	types::{
		FATTR4_ACL, FATTR4_FILEHANDLE, FATTR4_FS_LAYOUT_TYPES, FATTR4_FS_LOCATIONS,
		FATTR4_MOUNTED_ON_FILEID, FATTR4_OWNER, FATTR4_OWNER_GROUP, FATTR4_RDATTR_ERROR,
		FATTR4_SEC_LABEL, FATTR4_SUPPATTR_EXCLCREAT, FATTR4_SUPPORTED_ATTRS,
		FATTR4_TIME_ACCESS_SET, FATTR4_TIME_MODIFY_SET, SET_TO_CLIENT_TIME4, bitmap4, fattr4,
		fs_locations4, fsid4, nfs_fh4, nfs_ftype4, nfsace4, nfsstat4, nfstime4, specdata4,
	},
	xdr::{self, Decoder, Encoder},
};
use num::ToPrimitive as _;

mod table;


/// The highest attribute defined by each minor version.
const MAX_ATTR_V40: u32 = FATTR4_MOUNTED_ON_FILEID;
const MAX_ATTR_V41: u32 = crate::types::FATTR4_FS_CHARSET_CAP;
const MAX_ATTR_V42: u32 = FATTR4_SEC_LABEL;

/// Which fields of [`Attributes`] hold a value.
#[derive(
	Clone, Copy, Debug, Default, PartialEq, Eq, Hash, derive_more::BitOr, derive_more::BitOrAssign,
)]
pub struct Mask(u64);

impl Mask {
	pub const NONE: Self = Self(0);
	pub const TYPE: Self = Self(0x0000_0002);
	pub const SIZE: Self = Self(0x0000_0004);
	pub const FSID: Self = Self(0x0000_0008);
	pub const ACL: Self = Self(0x0000_0020);
	pub const FILEID: Self = Self(0x0000_0040);
	pub const MODE: Self = Self(0x0000_0080);
	pub const NUMLINKS: Self = Self(0x0000_0100);
	pub const OWNER: Self = Self(0x0000_0200);
	pub const GROUP: Self = Self(0x0000_0400);
	pub const RAWDEV: Self = Self(0x0000_0800);
	pub const ATIME: Self = Self(0x0000_1000);
	pub const CREATION: Self = Self(0x0000_2000);
	pub const CTIME: Self = Self(0x0000_4000);
	pub const MTIME: Self = Self(0x0000_8000);
	pub const SPACEUSED: Self = Self(0x0001_0000);
	pub const CHGTIME: Self = Self(0x0004_0000);
	pub const GENERATION: Self = Self(0x0008_0000);
	pub const CHANGE: Self = Self(0x0010_0000);

	/// The access time is to be set to the server's time.
	pub const ATIME_SERVER: Self = Self(0x0020_0000);

	/// The modify time is to be set to the server's time.
	pub const MTIME_SERVER: Self = Self(0x0040_0000);

	#[must_use]
	pub const fn union(self, other: Self) -> Self {
		Self(self.0 | other.0)
	}

	#[must_use]
	pub fn contains(self, other: Self) -> bool {
		self.0 & other.0 == other.0
	}

	#[must_use]
	pub fn intersects(self, other: Self) -> bool {
		self.0 & other.0 != 0
	}

	#[must_use]
	pub fn is_empty(self) -> bool {
		self.0 == 0
	}
}

/// The internal form of an object's attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
	pub mask: Mask,
	pub type_: Option<nfs_ftype4>,
	pub size: u64,
	pub fsid: fsid4,
	pub acl: Option<Vec<Ace>>,
	pub fileid: u64,
	pub mode: u32,
	pub numlinks: u32,
	pub owner: u32,
	pub group: u32,
	pub rawdev: specdata4,
	pub atime: nfstime4,
	pub creation: nfstime4,
	pub ctime: nfstime4,
	pub mtime: nfstime4,
	pub spaceused: u64,
	pub chgtime: nfstime4,
	pub change: u64,
	pub generation: u64,
}

/// An access control entry whose principal has been mapped to an id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ace {
	pub type_: u32,
	pub flag: u32,
	pub access_mask: u32,
	pub who: Who,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::IsVariant)]
pub enum Who {
	Owner,
	Group,
	Everyone,
	Uid(u32),
	Gid(u32),
}

impl Who {
	#[must_use]
	pub fn special(name: &str) -> Option<Self> {
		match name {
			"OWNER@" => Some(Self::Owner),
			"GROUP@" => Some(Self::Group),
			"EVERYONE@" => Some(Self::Everyone),
			_ => None,
		}
	}

	#[must_use]
	pub fn special_name(self) -> Option<&'static str> {
		match self {
			Self::Owner => Some("OWNER@"),
			Self::Group => Some("GROUP@"),
			Self::Everyone => Some("EVERYONE@"),
			Self::Uid(_) | Self::Gid(_) => None,
		}
	}
}

/// Whether an attribute may be read, written, or both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::BitOr)]
pub struct Access(u8);

impl Access {
	pub const READ: Self = Self(0x01);
	pub const WRITE: Self = Self(0x02);
	pub const READ_WRITE: Self = Self(0x03);

	#[must_use]
	pub fn contains(self, other: Self) -> bool {
		self.0 & other.0 == other.0
	}
}

/// The export an operation runs against and the minor version of its compound.
#[derive(Clone, Copy)]
pub struct Context<'a> {
	pub export: &'a dyn Export,
	pub minor_version: u32,
}

pub struct EncodeArgs<'a> {
	pub attrs: &'a Attributes,
	pub context: Option<Context<'a>>,
	pub file_handle: Option<&'a nfs_fh4>,
	pub mounted_on_fileid: u64,
	pub rdattr_error: nfsstat4,
}

impl<'a> EncodeArgs<'a> {
	#[must_use]
	pub fn new(attrs: &'a Attributes) -> Self {
		Self {
			attrs,
			context: None,
			file_handle: None,
			mounted_on_fileid: 0,
			rdattr_error: nfsstat4::NFS4_OK,
		}
	}
}

/// Everything a client-supplied fattr4 decodes into.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Decoded {
	pub attrs: Attributes,
	pub file_handle: Option<nfs_fh4>,
	pub fsinfo: FsInfo,
	pub rdattr_error: Option<nfsstat4>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::IsVariant)]
pub enum Comparison {
	Equal,
	NotEqual,
	RdattrError,
}

/// A row of the attribute table.
pub struct Entry {
	pub attr: u32,
	pub name: &'static str,
	pub supported: bool,

	/// The encoded size for fixed-size attributes, or zero.
	pub size: usize,

	/// The fields a successful decode populates.
	pub mask: Mask,

	/// The fields a decode populates when the client asks for the server's time.
	pub exp_mask: Mask,

	pub access: Access,
	encode: EncodeFn,
	decode: DecodeFn,
}

type EncodeFn = fn(&mut Encoder<Vec<u8>>, &mut Encode<'_>) -> Result<Encoded, xdr::Error>;

type DecodeFn = fn(&mut Decoder<'_>, &mut Decode<'_>) -> Result<Outcome, nfsstat4>;

enum Encoded {
	Success,
	Noop,
}

enum Outcome {
	Success,
	SuccessExp,
	Noop,
}

struct Encode<'a> {
	config: &'a Config,
	args: &'a EncodeArgs<'a>,
	max_attr: u32,
	fsinfo: Option<FsInfo>,
}

struct Decode<'a> {
	config: &'a Config,
	context: Option<Context<'a>>,
	decoded: Decoded,
}

/// Converts between [`Attributes`] and fattr4 for a server configuration.
pub struct AttributeCodec {
	config: Config,
}

impl AttributeCodec {
	#[must_use]
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// The highest attribute encoded for a context. Without one, every defined attribute is.
	#[must_use]
	pub fn max_attr(&self, context: Option<Context<'_>>) -> u32 {
		match context {
			Some(context) => max_attr(context.minor_version.min(self.config.max_minor_version)),
			None => MAX_ATTR_V42,
		}
	}

	/// Encode the requested attributes. Unsupported attributes are left out of the result's bitmap.
	pub fn attrs_to_wire(
		&self,
		args: &EncodeArgs<'_>,
		requested: &bitmap4,
	) -> Result<fattr4, nfsstat4> {
		let max_attr = self.max_attr(args.context);
		let mut state = Encode {
			config: &self.config,
			args,
			max_attr,
			fsinfo: None,
		};
		let mut encoder = Encoder::new(Vec::new());
		let mut attrmask = bitmap4::new();
		for attr in requested.iter() {
			if attr > max_attr {
				break;
			}
			let Some(entry) = entry(attr) else {
				break;
			};
			match (entry.encode)(&mut encoder, &mut state) {
				Ok(Encoded::Success) => attrmask.set(attr),
				Ok(Encoded::Noop) => (),
				Err(error) => {
					tracing::error!(?error, name = entry.name, "failed to encode the attribute");
					return Err(nfsstat4::NFS4ERR_SERVERFAULT);
				},
			}
		}
		Ok(fattr4 {
			attrmask,
			attr_vals: encoder.into_inner(),
		})
	}

	/// Decode a client-supplied fattr4. The decode stops at the first attribute that fails.
	/// A decoder's own status wins, then leftover bytes, then an attribute that cannot be set.
	pub fn wire_to_attrs(
		&self,
		fattr: &fattr4,
		context: Option<Context<'_>>,
	) -> Result<Decoded, nfsstat4> {
		if fattr.attr_vals.is_empty() {
			if fattr.attrmask.is_empty() {
				return Ok(Decoded::default());
			}
			tracing::debug!("attributes are requested with no values");
			return Err(nfsstat4::NFS4ERR_BADXDR);
		}
		let mut decoder = Decoder::from_bytes(&fattr.attr_vals);
		let mut state = Decode {
			config: &self.config,
			context,
			decoded: Decoded::default(),
		};
		let mut unsupported = false;
		for attr in fattr.attrmask.iter() {
			let Some(entry) = entry(attr) else {
				tracing::debug!(attr, "undefined attribute");
				return Err(nfsstat4::NFS4ERR_BADXDR);
			};
			match (entry.decode)(&mut decoder, &mut state) {
				Ok(Outcome::Success) => state.decoded.attrs.mask |= entry.mask,
				Ok(Outcome::SuccessExp) => state.decoded.attrs.mask |= entry.exp_mask,
				Ok(Outcome::Noop) => {
					tracing::debug!(name = entry.name, "the attribute cannot be set");
					unsupported = true;
					break;
				},
				Err(status) => {
					tracing::debug!(name = entry.name, %status, "failed to decode the attribute");
					return Err(status);
				},
			}
		}
		if !decoder.is_empty() {
			tracing::debug!(remaining = decoder.remaining(), "trailing bytes after the attributes");
			return Err(nfsstat4::NFS4ERR_BADXDR);
		}
		if unsupported {
			return Err(nfsstat4::NFS4ERR_ATTRNOTSUPP);
		}
		Ok(state.decoded)
	}

	/// Decode only the filesystem space and file counts of an fattr4.
	pub fn wire_to_fsinfo(&self, fattr: &fattr4) -> Result<FsInfo, nfsstat4> {
		let decoded = self.wire_to_attrs(fattr, None)?;
		Ok(decoded.fsinfo)
	}
}

/// Build the fattr4 that reports a per-entry error in place of the entry's attributes.
pub fn rdattr_error(status: nfsstat4) -> Result<fattr4, nfsstat4> {
	let mut encoder = Encoder::new(Vec::new());
	encoder.encode(&status).map_err(|error| {
		tracing::error!(?error, %status, "failed to encode the rdattr error");
		nfsstat4::NFS4ERR_SERVERFAULT
	})?;
	Ok(fattr4 {
		attrmask: bitmap4::from_attrs(&[FATTR4_RDATTR_ERROR]),
		attr_vals: encoder.into_inner(),
	})
}

/// Compare two encoded attribute sets byte for byte, attribute by attribute.
#[must_use]
pub fn fattr_equal(a: &fattr4, b: &fattr4) -> Comparison {
	if a.attrmask.0 != b.attrmask.0 {
		return Comparison::NotEqual;
	}
	if a.attrmask.get(FATTR4_RDATTR_ERROR) {
		return Comparison::RdattrError;
	}
	let mut offset = 0;
	for attr in a.attrmask.iter() {
		let Some(length) = encoded_length(&a.attr_vals, offset, attr) else {
			return Comparison::NotEqual;
		};
		let Some(end) = offset.checked_add(length) else {
			return Comparison::NotEqual;
		};
		match (a.attr_vals.get(offset..end), b.attr_vals.get(offset..end)) {
			(Some(a), Some(b)) if a == b => (),
			_ => return Comparison::NotEqual,
		}
		offset = end;
	}
	Comparison::Equal
}

/// The length of the attribute encoded at `offset`, including any length words and padding.
fn encoded_length(vals: &[u8], offset: usize, attr: u32) -> Option<usize> {
	let mut decoder = Decoder::from_bytes(vals.get(offset..)?);
	match attr {
		FATTR4_SUPPORTED_ATTRS | FATTR4_SUPPATTR_EXCLCREAT => {
			decoder.decode::<bitmap4>().ok()?;
		},
		FATTR4_FILEHANDLE | FATTR4_OWNER | FATTR4_OWNER_GROUP => {
			decoder.decode_opaque().ok()?;
		},
		FATTR4_ACL => {
			decoder.decode::<Vec<nfsace4>>().ok()?;
		},
		FATTR4_FS_LOCATIONS => {
			decoder.decode::<fs_locations4>().ok()?;
		},
		FATTR4_FS_LAYOUT_TYPES => {
			decoder.decode::<Vec<u32>>().ok()?;
		},
		FATTR4_TIME_ACCESS_SET | FATTR4_TIME_MODIFY_SET => {
			if decoder.decode_uint().ok()? == SET_TO_CLIENT_TIME4 {
				decoder.decode::<nfstime4>().ok()?;
			}
		},
		_ => {
			let entry = entry(attr)?;
			return (entry.supported && entry.size > 0).then_some(entry.size);
		},
	}
	Some(decoder.position())
}

/// Look up the table entry for an attribute.
#[must_use]
pub fn entry(attr: u32) -> Option<&'static Entry> {
	table::TABLE.get(attr.to_usize()?)
}

/// Whether every attribute in the bitmap permits the access. Undefined attributes are skipped.
#[must_use]
pub fn check_access_bitmap(bitmap: &bitmap4, access: Access) -> bool {
	bitmap
		.iter()
		.filter_map(entry)
		.all(|entry| entry.access.contains(access))
}

/// Clear the bits of attributes the server does not support.
pub fn remove_unsupported(bitmap: &mut bitmap4) {
	for entry in table::TABLE.iter().filter(|entry| !entry.supported) {
		bitmap.clear(entry.attr);
	}
}

/// Whether every attribute in the bitmap is defined and supported.
#[must_use]
pub fn all_supported(bitmap: &bitmap4) -> bool {
	bitmap
		.iter()
		.all(|attr| entry(attr).is_some_and(|entry| entry.supported))
}

/// The highest attribute defined by a minor version.
#[must_use]
pub fn max_attr(minor_version: u32) -> u32 {
	match minor_version {
		0 => MAX_ATTR_V40,
		1 => MAX_ATTR_V41,
		_ => MAX_ATTR_V42,
	}
}

/// The supported attributes of a minor version.
#[must_use]
pub fn supported_bitmap(minor_version: u32) -> bitmap4 {
	supported_up_to(max_attr(minor_version))
}

fn supported_up_to(max_attr: u32) -> bitmap4 {
	let mut bitmap = bitmap4::new();
	for entry in table::TABLE.iter() {
		if entry.attr <= max_attr && entry.supported {
			bitmap.set(entry.attr);
		}
	}
	bitmap
}

/// The supported attributes a client may set on an exclusive create.
#[must_use]
pub fn exclusive_create_bitmap() -> bitmap4 {
	let mut bitmap = supported_up_to(MAX_ATTR_V42);
	bitmap.clear(FATTR4_TIME_ACCESS_SET);
	bitmap.clear(FATTR4_TIME_MODIFY_SET);
	bitmap
}

impl Encode<'_> {
	fn export(&self) -> Option<&dyn Export> {
		self.args.context.map(|context| context.export)
	}

	/// Query the filesystem at most once per encode.
	fn fsinfo(&mut self) -> Result<FsInfo, xdr::Error> {
		if let Some(fsinfo) = self.fsinfo {
			return Ok(fsinfo);
		}
		let fsinfo = match self.export() {
			Some(export) => export
				.statfs()
				.map_err(|status| xdr::Error::Custom(format!("failed to stat the filesystem: {status}")))?,
			None => FsInfo::PROBE,
		};
		self.fsinfo = Some(fsinfo);
		Ok(fsinfo)
	}
}

impl Decode<'_> {
	fn export(&self) -> Option<&dyn Export> {
		self.context.map(|context| context.export)
	}
}
