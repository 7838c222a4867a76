use crate::{
	client::{self, Client, Clients},
	config::Config,
	types::{NFS4_OTHER_SIZE, clientid4, nfs_fh4, nfsstat4, stateid4},
};
use dashmap::{DashMap, mapref::entry::Entry};
use num::ToPrimitive as _;
use std::sync::{
	Arc, Mutex, MutexGuard, PoisonError,
	atomic::{AtomicU32, Ordering},
};

#[cfg(test)]
mod tests;

pub type Other = [u8; NFS4_OTHER_SIZE];

pub const ALL_ZERO_OTHER: Other = [0x00; NFS4_OTHER_SIZE];
pub const ALL_ONES_OTHER: Other = [0xff; NFS4_OTHER_SIZE];
pub const ALL_ONES_SEQID: u32 = 0xFFFF_FFFF;

pub const ANONYMOUS_STATE_ID: stateid4 = stateid4 {
	seqid: 0,
	other: ALL_ZERO_OTHER,
};

pub const READ_BYPASS_STATE_ID: stateid4 = stateid4 {
	seqid: ALL_ONES_SEQID,
	other: ALL_ONES_OTHER,
};

pub const CURRENT_STATE_ID: stateid4 = stateid4 {
	seqid: 1,
	other: ALL_ZERO_OTHER,
};

/// The special stateids an operation accepts, and the special handling it wants.
#[derive(
	Clone, Copy, Debug, Default, PartialEq, Eq, derive_more::BitOr, derive_more::BitOrAssign,
)]
pub struct Flags(u32);

/// The table of open, lock, delegation, and layout state, keyed by the `other` field of the stateid.
pub struct StateTable {
	clients: Arc<dyn Clients>,
	epoch: u32,
	states: DashMap<Other, Arc<State>>,
}

#[derive(Debug)]
pub struct State {
	other: Other,
	type_: StateType,
	seqid: AtomicU32,
	refs: Mutex<Option<Refs>>,
	locks: Mutex<Vec<Lock>>,
}

#[derive(Clone, Debug)]
struct Refs {
	file: nfs_fh4,
	owner: Arc<Owner>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display, derive_more::IsVariant)]
pub enum StateType {
	#[display("NONE")]
	None,
	#[display("SHARE")]
	Share,
	#[display("DELEGATION")]
	Delegation,
	#[display("LOCK")]
	Lock,
	#[display("LAYOUT")]
	Layout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lock {
	pub offset: u64,
	pub length: u64,
	pub write: bool,
}

/// An open or lock owner.
#[derive(Debug)]
pub struct Owner {
	client: Arc<dyn Client>,
	name: Vec<u8>,
	seqid: AtomicU32,
}

/// Per-compound state that stateid checks read and update.
#[derive(Debug, Default)]
pub struct Compound {
	pub minor_version: u32,
	pub current_stateid: stateid4,
	pub current_stateid_valid: bool,
	pub preserved_client: Option<Arc<dyn Client>>,
}

pub struct ValidateArg<'a> {
	pub stateid: stateid4,
	pub file: Option<&'a nfs_fh4>,
	pub flags: Flags,
	pub owner_seqid: u32,
	pub check_seqid: bool,
	pub tag: &'a str,
}

#[derive(Debug, derive_more::IsVariant)]
pub enum Validated {
	/// The stateid refers to this state.
	State(Arc<State>),

	/// A special stateid the operation accepts. There is no state.
	Special,

	/// A close of a state that no longer exists, from a client that still does.
	ReplayedClose,

	/// The request repeats the last one for this state. The caller should replay its cached response.
	Replay(Arc<State>),
}

pub struct DisplayOther<'a>(pub &'a Other);

impl Flags {
	pub const NONE: Self = Self(0x00);
	pub const ALL_0: Self = Self(0x01);
	pub const ALL_1: Self = Self(0x02);
	pub const CURRENT: Self = Self(0x04);
	pub const CLOSE_40: Self = Self(0x08);
	pub const CLOSE_41: Self = Self(0x10);
	pub const FREE: Self = Self(0x20);

	#[must_use]
	pub fn contains(self, other: Self) -> bool {
		self.0 & other.0 == other.0
	}

	#[must_use]
	pub fn intersects(self, other: Self) -> bool {
		self.0 & other.0 != 0
	}
}

impl StateTable {
	#[must_use]
	pub fn new(epoch: u64, clients: Arc<dyn Clients>) -> Self {
		let epoch = (epoch & 0xFFFF_FFFF).to_u32().unwrap_or_default();
		Self {
			clients,
			epoch,
			states: DashMap::default(),
		}
	}

	#[must_use]
	pub fn with_config(config: &Config, clients: Arc<dyn Clients>) -> Self {
		Self::new(config.epoch().into(), clients)
	}

	#[must_use]
	pub fn epoch(&self) -> u32 {
		self.epoch
	}

	/// Mint a new `other` for a state belonging to this client.
	///
	/// The first eight bytes are the client id and the last four are the client's state counter after incrementing it. The counter wraps silently.
	#[must_use]
	pub fn build_other(client: &dyn Client) -> Other {
		let counter = client
			.state_counter()
			.fetch_add(1, Ordering::SeqCst)
			.wrapping_add(1);
		let mut other = [0; NFS4_OTHER_SIZE];
		other[..8].copy_from_slice(&client.clientid().to_be_bytes());
		other[8..].copy_from_slice(&counter.to_be_bytes());
		other
	}

	/// Insert a state. Returns false and leaves the table unchanged if its `other` is already present.
	pub fn insert(&self, state: Arc<State>) -> bool {
		match self.states.entry(state.other) {
			Entry::Occupied(_) => {
				tracing::error!(
					other = %DisplayOther(&state.other),
					"stateid collision, the state was not inserted"
				);
				false
			},
			Entry::Vacant(entry) => {
				entry.insert(state);
				true
			},
		}
	}

	/// Get a state. The returned handle keeps the state alive after it is removed from the table.
	#[must_use]
	pub fn get(&self, other: &Other) -> Option<Arc<State>> {
		let state = self.states.get(other).map(|state| state.value().clone());
		if state.is_none() {
			tracing::debug!(other = %DisplayOther(other), "state not found");
		}
		state
	}

	/// Remove a state from the table. Holders of the state keep their handles.
	pub fn remove(&self, other: &Other) -> bool {
		let removed = self.states.remove(other).is_some();
		if !removed {
			tracing::debug!(other = %DisplayOther(other), "failed to remove the state");
		}
		removed
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.states.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	/// Log every state in the table.
	pub fn log_all(&self) {
		for entry in &self.states {
			let state = entry.value();
			tracing::debug!(
				%state,
				refcount = State::refcount(state),
				"state"
			);
		}
	}

	/// Check a stateid presented by an operation.
	///
	/// On success with a state, the compound's current stateid is set to the state's current stateid. On every other outcome, including a replay, the compound's current stateid is invalidated.
	pub fn validate(
		&self,
		compound: &mut Compound,
		arg: &ValidateArg<'_>,
	) -> Result<Validated, nfsstat4> {
		let result = self.try_validate(compound, arg);
		match &result {
			Ok(Validated::State(state)) => {
				compound.current_stateid = state.stateid();
				compound.current_stateid_valid = true;
			},
			Ok(Validated::Replay(state)) => {
				tracing::debug!(tag = arg.tag, %state, "possible replay");
				compound.current_stateid_valid = false;
			},
			Ok(Validated::Special | Validated::ReplayedClose) => {
				compound.current_stateid_valid = false;
			},
			Err(status) => {
				tracing::debug!(
					tag = arg.tag,
					stateid = %arg.stateid,
					%status,
					"stateid check failed"
				);
				compound.current_stateid_valid = false;
			},
		}
		result
	}

	fn try_validate(
		&self,
		compound: &mut Compound,
		arg: &ValidateArg<'_>,
	) -> Result<Validated, nfsstat4> {
		// Handle the special stateids.
		let stateid = if arg.stateid.other == ALL_ZERO_OTHER {
			match arg.stateid.seqid {
				0 if arg.flags.contains(Flags::ALL_0) => {
					tracing::debug!(tag = arg.tag, "found the special all zero stateid");
					return Ok(Validated::Special);
				},
				1 if arg.flags.contains(Flags::CURRENT) => {
					if !compound.current_stateid_valid {
						tracing::debug!(tag = arg.tag, "the current stateid is not valid");
						return Err(nfsstat4::NFS4ERR_BAD_STATEID);
					}
					compound.current_stateid
				},
				_ => return Err(nfsstat4::NFS4ERR_BAD_STATEID),
			}
		} else if arg.stateid.other == ALL_ONES_OTHER {
			if arg.stateid.seqid == ALL_ONES_SEQID && arg.flags.contains(Flags::ALL_1) {
				tracing::debug!(tag = arg.tag, "found the special all ones stateid");
				return Ok(Validated::Special);
			}
			return Err(nfsstat4::NFS4ERR_BAD_STATEID);
		} else {
			arg.stateid
		};

		// Check that the stateid was minted by this server instance.
		let clientid = other_clientid(&stateid.other);
		if client::clientid_epoch(clientid) != self.epoch {
			return Err(nfsstat4::NFS4ERR_STALE_STATEID);
		}

		// Get the state along with its file and owner.
		let found = self.get(&stateid.other);
		let (state, refs) = match found {
			Some(state) => match state.refs() {
				Some(refs) => (state, refs),
				None => return self.check_missing(compound, arg.flags, clientid, true),
			},
			None => return self.check_missing(compound, arg.flags, clientid, false),
		};

		// Reserve the owner's lease for the rest of the compound if it is not reserved already.
		let owner_client = refs.owner.client.clone();
		let reserved = compound
			.preserved_client
			.as_deref()
			.is_some_and(|client| client::same_client(client, owner_client.as_ref()));
		if !reserved {
			compound.release_preserved_client();
			if !owner_client.reserve_lease() {
				return Err(nfsstat4::NFS4ERR_EXPIRED);
			}
			compound.preserved_client = Some(owner_client);
		}

		// Check the file.
		if let Some(file) = arg.file
			&& *file != refs.file
		{
			tracing::debug!(tag = arg.tag, %state, "the stateid has the wrong file");
			return Err(nfsstat4::NFS4ERR_BAD_STATEID);
		}

		// Check the seqid. A zero seqid matches any seqid except for layouts.
		let state_seqid = state.seqid();
		if state.type_.is_layout() || stateid.seqid != 0 {
			let diff = stateid.seqid.wrapping_sub(state_seqid).cast_signed();
			let owner_matches = arg.check_seqid && arg.owner_seqid == refs.owner.seqid();
			if diff < 0 {
				let previous =
					diff == -1 || (state_seqid == 1 && stateid.seqid == ALL_ONES_SEQID);
				if previous && owner_matches {
					return Ok(Validated::Replay(state));
				}
				tracing::debug!(tag = arg.tag, %state, "old stateid");
				return Err(nfsstat4::NFS4ERR_OLD_STATEID);
			}
			if diff == 0 && owner_matches {
				return Ok(Validated::Replay(state));
			}
			if diff > 0 {
				tracing::debug!(tag = arg.tag, %state, "stateid seqid is ahead of the state");
				return Err(nfsstat4::NFS4ERR_BAD_STATEID);
			}
		}

		// A state can only be freed if it is a lock state without locks.
		if arg.flags.contains(Flags::FREE) {
			let held = match state.type_ {
				StateType::Lock => !state.locks().is_empty(),
				StateType::None
				| StateType::Share
				| StateType::Delegation
				| StateType::Layout => true,
			};
			if held {
				return Err(nfsstat4::NFS4ERR_LOCKS_HELD);
			}
		}

		Ok(Validated::State(state))
	}

	/// Handle a stateid from this server instance whose state is gone or is being torn down.
	fn check_missing(
		&self,
		compound: &mut Compound,
		flags: Flags,
		clientid: clientid4,
		found: bool,
	) -> Result<Validated, nfsstat4> {
		let client = self.clients.lookup_confirmed_client(clientid)?;

		// A close from a live client for a state that is gone is a replayed close.
		if flags.intersects(Flags::CLOSE_40 | Flags::CLOSE_41) {
			compound.release_preserved_client();
			if !client.reserve_lease() {
				return Err(nfsstat4::NFS4ERR_EXPIRED);
			}
			if flags.contains(Flags::CLOSE_40) {
				client.release_lease();
			} else {
				compound.preserved_client = Some(client);
			}
			tracing::debug!("replayed close");
			return Ok(Validated::ReplayedClose);
		}

		if !found {
			return Err(nfsstat4::NFS4ERR_BAD_STATEID);
		}

		// The state exists but its file or owner is gone. If the lease is still valid, the file is stale.
		if !client.reserve_lease() {
			return Err(nfsstat4::NFS4ERR_EXPIRED);
		}
		client.release_lease();
		Err(nfsstat4::NFS4ERR_STALE)
	}
}

impl State {
	#[must_use]
	pub fn new(other: Other, type_: StateType, file: nfs_fh4, owner: Arc<Owner>) -> Self {
		Self {
			other,
			type_,
			seqid: AtomicU32::new(0),
			refs: Mutex::new(Some(Refs { file, owner })),
			locks: Mutex::new(Vec::new()),
		}
	}

	#[must_use]
	pub fn other(&self) -> &Other {
		&self.other
	}

	#[must_use]
	pub fn type_(&self) -> StateType {
		self.type_
	}

	#[must_use]
	pub fn seqid(&self) -> u32 {
		self.seqid.load(Ordering::SeqCst)
	}

	#[must_use]
	pub fn stateid(&self) -> stateid4 {
		stateid4 {
			seqid: self.seqid(),
			other: self.other,
		}
	}

	/// The number of live handles to this state, including the table's.
	#[must_use]
	pub fn refcount(this: &Arc<Self>) -> usize {
		Arc::strong_count(this)
	}

	#[must_use]
	pub fn file(&self) -> Option<nfs_fh4> {
		self.refs().map(|refs| refs.file)
	}

	#[must_use]
	pub fn owner(&self) -> Option<Arc<Owner>> {
		self.refs().map(|refs| refs.owner)
	}

	fn refs(&self) -> Option<Refs> {
		self.refs
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	/// Drop the state's file and owner. Subsequent checks of its stateid fail with a stale or expired status.
	pub fn detach(&self) {
		self.refs
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take();
	}

	pub fn locks(&self) -> MutexGuard<'_, Vec<Lock>> {
		self.locks.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Increment the seqid, skipping zero, and make the result the compound's current stateid.
	pub fn bump_seqid(&self, compound: &mut Compound) -> stateid4 {
		let (Ok(previous) | Err(previous)) =
			self.seqid
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |seqid| {
					Some(next_seqid(seqid))
				});
		let stateid = stateid4 {
			seqid: next_seqid(previous),
			other: self.other,
		};
		compound.current_stateid = stateid;
		compound.current_stateid_valid = true;
		stateid
	}
}

impl Owner {
	#[must_use]
	pub fn new(client: Arc<dyn Client>, name: Vec<u8>, seqid: u32) -> Self {
		Self {
			client,
			name,
			seqid: AtomicU32::new(seqid),
		}
	}

	#[must_use]
	pub fn client(&self) -> &Arc<dyn Client> {
		&self.client
	}

	#[must_use]
	pub fn name(&self) -> &[u8] {
		&self.name
	}

	#[must_use]
	pub fn seqid(&self) -> u32 {
		self.seqid.load(Ordering::SeqCst)
	}

	pub fn set_seqid(&self, seqid: u32) {
		self.seqid.store(seqid, Ordering::SeqCst);
	}
}

impl Compound {
	#[must_use]
	pub fn new(minor_version: u32) -> Self {
		Self {
			minor_version,
			current_stateid: stateid4::default(),
			current_stateid_valid: false,
			preserved_client: None,
		}
	}

	/// Renew and release the lease held for the rest of the compound, if any.
	pub fn release_preserved_client(&mut self) {
		if let Some(client) = self.preserved_client.take() {
			client.release_lease();
		}
	}
}

impl Drop for Compound {
	fn drop(&mut self) {
		self.release_preserved_client();
	}
}

impl Validated {
	#[must_use]
	pub fn state(&self) -> Option<&Arc<State>> {
		match self {
			Self::State(state) | Self::Replay(state) => Some(state),
			Self::Special | Self::ReplayedClose => None,
		}
	}

	#[must_use]
	pub fn status(&self) -> nfsstat4 {
		match self {
			Self::Replay(_) => nfsstat4::NFS4ERR_REPLAY,
			_ => nfsstat4::NFS4_OK,
		}
	}
}

fn next_seqid(seqid: u32) -> u32 {
	match seqid.wrapping_add(1) {
		0 => 1,
		seqid => seqid,
	}
}

fn other_clientid(other: &Other) -> clientid4 {
	let mut clientid = [0; 8];
	clientid.copy_from_slice(&other[..8]);
	u64::from_be_bytes(clientid)
}

fn other_counter(other: &Other) -> u32 {
	let mut counter = [0; 4];
	counter.copy_from_slice(&other[8..]);
	u32::from_be_bytes(counter)
}

impl std::fmt::Display for DisplayOther<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let other = self.0;
		if *other == ALL_ZERO_OTHER {
			return write!(f, "OTHER=ALL-0");
		}
		if *other == ALL_ONES_OTHER {
			return write!(f, "OTHER=ALL-1");
		}
		let clientid = other_clientid(other);
		write!(
			f,
			"OTHER=0x{} {{CLIENTID Epoch=0x{:08x} Counter=0x{:08x} StateIdCounter=0x{:08x}}}",
			data_encoding::HEXLOWER.encode(other),
			client::clientid_epoch(clientid),
			client::clientid_counter(clientid),
			other_counter(other),
		)
	}
}

impl std::fmt::Display for stateid4 {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} seqid={}", DisplayOther(&self.other), self.seqid)
	}
}

impl std::fmt::Display for State {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"{} type={} seqid={}",
			DisplayOther(&self.other),
			self.type_,
			self.seqid()
		)
	}
}
