use super::*;
use bytes::Bytes;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, AtomicI32};

const EPOCH: u32 = 5;

#[derive(Debug)]
struct TestClient {
	clientid: clientid4,
	counter: AtomicU32,
	expired: AtomicBool,
	reservations: AtomicI32,
	renewals: AtomicU32,
}

#[derive(Default)]
struct TestClients {
	clients: DashMap<clientid4, Arc<TestClient>>,
}

impl TestClient {
	fn new(counter: u32) -> Self {
		Self {
			clientid: client::clientid(EPOCH, counter),
			counter: AtomicU32::new(0),
			expired: AtomicBool::new(false),
			reservations: AtomicI32::new(0),
			renewals: AtomicU32::new(0),
		}
	}

	fn reservations(&self) -> i32 {
		self.reservations.load(Ordering::SeqCst)
	}

	fn renewals(&self) -> u32 {
		self.renewals.load(Ordering::SeqCst)
	}
}

impl Client for TestClient {
	fn clientid(&self) -> clientid4 {
		self.clientid
	}

	fn state_counter(&self) -> &AtomicU32 {
		&self.counter
	}

	fn reserve_lease(&self) -> bool {
		if self.expired.load(Ordering::SeqCst) {
			return false;
		}
		self.reservations.fetch_add(1, Ordering::SeqCst);
		true
	}

	fn release_lease(&self) {
		self.reservations.fetch_sub(1, Ordering::SeqCst);
		self.renewals.fetch_add(1, Ordering::SeqCst);
	}
}

impl Clients for TestClients {
	fn lookup_confirmed_client(&self, clientid: clientid4) -> Result<Arc<dyn Client>, nfsstat4> {
		let client = self
			.clients
			.get(&clientid)
			.ok_or(nfsstat4::NFS4ERR_STALE_CLIENTID)?;
		Ok(client.value().clone())
	}
}

struct Fixture {
	clients: Arc<TestClients>,
	table: StateTable,
}

impl Fixture {
	fn new() -> Self {
		let clients = Arc::new(TestClients::default());
		let config = Config {
			epoch: Some(EPOCH),
			..Config::default()
		};
		let table = StateTable::with_config(&config, clients.clone());
		Self { clients, table }
	}

	fn client(&self, counter: u32) -> Arc<TestClient> {
		let client = Arc::new(TestClient::new(counter));
		self.clients.clients.insert(client.clientid, client.clone());
		client
	}

	fn state(
		&self,
		client: &Arc<TestClient>,
		type_: StateType,
		owner_seqid: u32,
		seqid: u32,
	) -> Arc<State> {
		let owner = Arc::new(Owner::new(client.clone(), b"owner".to_vec(), owner_seqid));
		let other = StateTable::build_other(&**client);
		let state = Arc::new(State::new(other, type_, file(1), owner));
		let mut compound = Compound::default();
		for _ in 0..seqid {
			state.bump_seqid(&mut compound);
		}
		assert!(self.table.insert(state.clone()));
		state
	}
}

fn file(id: u8) -> nfs_fh4 {
	nfs_fh4(Bytes::from(vec![id; 8]))
}

fn arg(stateid: stateid4) -> ValidateArg<'static> {
	ValidateArg {
		stateid,
		file: None,
		flags: Flags::NONE,
		owner_seqid: 0,
		check_seqid: false,
		tag: "test",
	}
}

#[test]
fn build_other() {
	let fixture = Fixture::new();
	let client = fixture.client(3);
	let other = StateTable::build_other(&*client);
	assert_eq!(&other[..8], &0x0000_0005_0000_0003u64.to_be_bytes());
	assert_eq!(&other[8..], &1u32.to_be_bytes());
	let others = (0..100)
		.map(|_| StateTable::build_other(&*client))
		.collect::<std::collections::HashSet<_>>();
	assert_eq!(others.len(), 100);
}

#[test]
fn insert_is_not_overwriting() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let state = fixture.state(&client, StateType::Share, 0, 1);
	let owner = state.owner().unwrap();
	let duplicate = Arc::new(State::new(
		*state.other(),
		StateType::Lock,
		file(2),
		owner,
	));
	assert!(!fixture.table.insert(duplicate));
	assert_eq!(fixture.table.len(), 1);
	let found = fixture.table.get(state.other()).unwrap();
	assert_eq!(found.type_(), StateType::Share);
}

#[test]
fn get_and_remove() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let state = fixture.state(&client, StateType::Share, 0, 1);
	let other = *state.other();
	let held = fixture.table.get(&other).unwrap();
	assert_eq!(State::refcount(&held), 3);
	assert!(fixture.table.remove(&other));
	assert!(!fixture.table.remove(&other));
	assert!(fixture.table.get(&other).is_none());
	assert_eq!(State::refcount(&held), 2);
	drop(state);
	assert_eq!(State::refcount(&held), 1);
	assert_eq!(held.type_(), StateType::Share);
}

#[test]
fn valid_stateid() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let state = fixture.state(&client, StateType::Share, 0, 3);
	let mut compound = Compound::new(1);
	let stateid = state.stateid();
	let validated = fixture.table.validate(&mut compound, &arg(stateid)).unwrap();
	assert!(validated.is_state());
	assert_eq!(validated.status(), nfsstat4::NFS4_OK);
	assert!(Arc::ptr_eq(validated.state().unwrap(), &state));
	assert!(compound.current_stateid_valid);
	assert_eq!(compound.current_stateid, stateid);

	// The lease is held until the compound ends.
	assert_eq!(client.reservations(), 1);
	drop(compound);
	assert_eq!(client.reservations(), 0);
	assert_eq!(client.renewals(), 1);
}

#[test]
fn zero_seqid_echoes_the_current_seqid() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let state = fixture.state(&client, StateType::Lock, 0, 4);
	let mut compound = Compound::new(1);
	let stateid = stateid4 {
		seqid: 0,
		other: *state.other(),
	};
	let validated = fixture.table.validate(&mut compound, &arg(stateid)).unwrap();
	assert!(validated.is_state());
	assert_eq!(compound.current_stateid.seqid, 4);
}

#[test]
fn zero_seqid_is_checked_for_layouts() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let state = fixture.state(&client, StateType::Layout, 0, 2);
	let mut compound = Compound::new(1);
	let stateid = stateid4 {
		seqid: 0,
		other: *state.other(),
	};
	let status = fixture
		.table
		.validate(&mut compound, &arg(stateid))
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_OLD_STATEID);
}

#[test]
fn stale_epoch() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let state = fixture.state(&client, StateType::Share, 0, 1);
	let mut other = *state.other();
	other[..4].copy_from_slice(&(EPOCH + 1).to_be_bytes());
	for seqid in [0, 1, 2, ALL_ONES_SEQID] {
		let mut compound = Compound::new(1);
		let stateid = stateid4 { seqid, other };
		let status = fixture
			.table
			.validate(&mut compound, &arg(stateid))
			.unwrap_err();
		assert_eq!(status, nfsstat4::NFS4ERR_STALE_STATEID);
		assert!(!compound.current_stateid_valid);
	}
}

#[test]
fn replay_of_the_previous_seqid() {
	let fixture = Fixture::new();
	let client = fixture.client(3);
	let state = fixture.state(&client, StateType::Share, 42, 7);
	assert_eq!(&state.other()[..8], &0x0000_0005_0000_0003u64.to_be_bytes());
	let mut compound = Compound::new(0);
	let arg = ValidateArg {
		check_seqid: true,
		owner_seqid: 42,
		..arg(stateid4 {
			seqid: 6,
			other: *state.other(),
		})
	};
	let validated = fixture.table.validate(&mut compound, &arg).unwrap();
	assert!(validated.is_replay());
	assert_eq!(validated.status(), nfsstat4::NFS4ERR_REPLAY);
	assert!(validated.state().is_some());
	assert!(!compound.current_stateid_valid);
}

#[test]
fn replay_of_the_wrapped_seqid() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let state = fixture.state(&client, StateType::Share, 9, 1);
	let mut compound = Compound::new(0);
	let arg = ValidateArg {
		check_seqid: true,
		owner_seqid: 9,
		..arg(stateid4 {
			seqid: ALL_ONES_SEQID,
			other: *state.other(),
		})
	};
	let validated = fixture.table.validate(&mut compound, &arg).unwrap();
	assert!(validated.is_replay());
}

#[test]
fn replay_of_the_current_seqid() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let state = fixture.state(&client, StateType::Share, 9, 3);
	let mut compound = Compound::new(0);
	let arg = ValidateArg {
		check_seqid: true,
		owner_seqid: 9,
		..arg(state.stateid())
	};
	let validated = fixture.table.validate(&mut compound, &arg).unwrap();
	assert!(validated.is_replay());
}

#[test]
fn old_and_future_seqids() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let state = fixture.state(&client, StateType::Share, 9, 7);
	let other = *state.other();

	// Without seqid checking, the previous seqid is old.
	let mut compound = Compound::new(1);
	let status = fixture
		.table
		.validate(&mut compound, &arg(stateid4 { seqid: 6, other }))
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_OLD_STATEID);

	// A mismatched owner seqid is not a replay.
	let mut compound = Compound::new(0);
	let mismatched = ValidateArg {
		check_seqid: true,
		owner_seqid: 8,
		..arg(stateid4 { seqid: 6, other })
	};
	let status = fixture
		.table
		.validate(&mut compound, &mismatched)
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_OLD_STATEID);

	// Two behind is old even when the owner matches.
	let mut compound = Compound::new(0);
	let two_behind = ValidateArg {
		check_seqid: true,
		owner_seqid: 9,
		..arg(stateid4 { seqid: 5, other })
	};
	let status = fixture
		.table
		.validate(&mut compound, &two_behind)
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_OLD_STATEID);

	// A seqid ahead of the state is bad.
	let mut compound = Compound::new(1);
	let status = fixture
		.table
		.validate(&mut compound, &arg(stateid4 { seqid: 8, other }))
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_BAD_STATEID);
}

#[test]
fn special_all_zero() {
	let fixture = Fixture::new();
	let mut compound = Compound::new(1);
	compound.current_stateid_valid = true;
	let anonymous = ValidateArg {
		flags: Flags::ALL_0,
		..arg(ANONYMOUS_STATE_ID)
	};
	let validated = fixture.table.validate(&mut compound, &anonymous).unwrap();
	assert!(validated.is_special());
	assert!(validated.state().is_none());
	assert!(!compound.current_stateid_valid);

	// The anonymous stateid is rejected when the operation does not allow it.
	let mut compound = Compound::new(1);
	let status = fixture
		.table
		.validate(&mut compound, &arg(ANONYMOUS_STATE_ID))
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_BAD_STATEID);

	// Any other seqid with an all zero other is bad.
	let mut compound = Compound::new(1);
	let other_seqid = ValidateArg {
		flags: Flags::ALL_0 | Flags::CURRENT,
		..arg(stateid4 {
			seqid: 2,
			other: ALL_ZERO_OTHER,
		})
	};
	let status = fixture
		.table
		.validate(&mut compound, &other_seqid)
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_BAD_STATEID);
}

#[test]
fn special_all_ones() {
	let fixture = Fixture::new();
	let mut compound = Compound::new(1);
	let bypass = ValidateArg {
		flags: Flags::ALL_1,
		..arg(READ_BYPASS_STATE_ID)
	};
	let validated = fixture.table.validate(&mut compound, &bypass).unwrap();
	assert!(validated.is_special());

	let zero_seqid = ValidateArg {
		flags: Flags::ALL_1,
		..arg(stateid4 {
			seqid: 0,
			other: ALL_ONES_OTHER,
		})
	};
	let status = fixture
		.table
		.validate(&mut compound, &zero_seqid)
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_BAD_STATEID);
}

#[test]
fn current_stateid() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let state = fixture.state(&client, StateType::Share, 0, 2);
	let current = ValidateArg {
		flags: Flags::CURRENT,
		..arg(CURRENT_STATE_ID)
	};

	// Without a current stateid the special current stateid is bad.
	let mut compound = Compound::new(1);
	let status = fixture
		.table
		.validate(&mut compound, &current)
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_BAD_STATEID);

	// After a successful check, the current stateid refers to the same state.
	fixture
		.table
		.validate(&mut compound, &arg(state.stateid()))
		.unwrap();
	let validated = fixture.table.validate(&mut compound, &current).unwrap();
	assert!(Arc::ptr_eq(validated.state().unwrap(), &state));
	assert_eq!(compound.current_stateid, state.stateid());

	// A bumped seqid becomes the current stateid.
	let bumped = state.bump_seqid(&mut compound);
	assert_eq!(bumped.seqid, 3);
	let validated = fixture.table.validate(&mut compound, &current).unwrap();
	assert!(validated.is_state());
	assert_eq!(compound.current_stateid, bumped);
}

#[test]
fn missing_state() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let mut other = StateTable::build_other(&*client);
	let stateid = stateid4 { seqid: 1, other };

	// The client is known, so the stateid is bad.
	let mut compound = Compound::new(1);
	let status = fixture
		.table
		.validate(&mut compound, &arg(stateid))
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_BAD_STATEID);

	// The client is unknown, so the client lookup error is returned.
	other[4..8].copy_from_slice(&99u32.to_be_bytes());
	let status = fixture
		.table
		.validate(&mut compound, &arg(stateid4 { seqid: 1, other }))
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_STALE_CLIENTID);
}

#[test]
fn replayed_close() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let other = StateTable::build_other(&*client);
	let stateid = stateid4 { seqid: 2, other };

	// A v4.0 close renews the lease right away.
	let mut compound = Compound::new(0);
	let close = ValidateArg {
		flags: Flags::CLOSE_40,
		..arg(stateid)
	};
	let validated = fixture.table.validate(&mut compound, &close).unwrap();
	assert!(validated.is_replayed_close());
	assert_eq!(validated.status(), nfsstat4::NFS4_OK);
	assert!(compound.preserved_client.is_none());
	assert_eq!(client.reservations(), 0);
	assert_eq!(client.renewals(), 1);

	// A v4.1 close keeps the lease reserved for the rest of the compound.
	let mut compound = Compound::new(1);
	let close = ValidateArg {
		flags: Flags::CLOSE_41,
		..arg(stateid)
	};
	let validated = fixture.table.validate(&mut compound, &close).unwrap();
	assert!(validated.is_replayed_close());
	assert_eq!(client.reservations(), 1);
	compound.release_preserved_client();
	assert_eq!(client.reservations(), 0);
	assert_eq!(client.renewals(), 2);

	// An expired lease fails the close.
	client.expired.store(true, Ordering::SeqCst);
	let mut compound = Compound::new(1);
	let status = fixture
		.table
		.validate(&mut compound, &close)
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_EXPIRED);
}

#[test]
fn detached_state() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let state = fixture.state(&client, StateType::Share, 0, 1);
	state.detach();
	assert!(state.file().is_none());

	let mut compound = Compound::new(1);
	let status = fixture
		.table
		.validate(&mut compound, &arg(state.stateid()))
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_STALE);
	assert_eq!(client.reservations(), 0);
	assert_eq!(client.renewals(), 1);

	client.expired.store(true, Ordering::SeqCst);
	let status = fixture
		.table
		.validate(&mut compound, &arg(state.stateid()))
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_EXPIRED);
}

#[test]
fn expired_lease() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let state = fixture.state(&client, StateType::Share, 0, 1);
	client.expired.store(true, Ordering::SeqCst);
	let mut compound = Compound::new(1);
	let status = fixture
		.table
		.validate(&mut compound, &arg(state.stateid()))
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_EXPIRED);
	assert!(compound.preserved_client.is_none());
}

#[test]
fn preserved_client_switches() {
	let fixture = Fixture::new();
	let first = fixture.client(1);
	let second = fixture.client(2);
	let a = fixture.state(&first, StateType::Share, 0, 1);
	let b = fixture.state(&first, StateType::Lock, 0, 1);
	let c = fixture.state(&second, StateType::Share, 0, 1);
	let mut compound = Compound::new(1);

	// Two states of the same client reserve the lease once.
	fixture.table.validate(&mut compound, &arg(a.stateid())).unwrap();
	fixture.table.validate(&mut compound, &arg(b.stateid())).unwrap();
	assert_eq!(first.reservations(), 1);

	// A state of another client releases the first lease.
	fixture.table.validate(&mut compound, &arg(c.stateid())).unwrap();
	assert_eq!(first.reservations(), 0);
	assert_eq!(first.renewals(), 1);
	assert_eq!(second.reservations(), 1);
	drop(compound);
	assert_eq!(second.reservations(), 0);
}

#[test]
fn wrong_file() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let state = fixture.state(&client, StateType::Share, 0, 1);
	let mut compound = Compound::new(1);
	let other_file = file(2);
	let wrong = ValidateArg {
		file: Some(&other_file),
		..arg(state.stateid())
	};
	let status = fixture.table.validate(&mut compound, &wrong).unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_BAD_STATEID);

	let right_file = file(1);
	let right = ValidateArg {
		file: Some(&right_file),
		..arg(state.stateid())
	};
	assert!(fixture.table.validate(&mut compound, &right).is_ok());
}

#[test]
fn free() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let lock = fixture.state(&client, StateType::Lock, 0, 1);
	let share = fixture.state(&client, StateType::Share, 0, 1);
	let mut compound = Compound::new(1);
	let free = |state: &State| ValidateArg {
		flags: Flags::FREE,
		..arg(state.stateid())
	};

	assert!(fixture.table.validate(&mut compound, &free(&lock)).is_ok());

	lock.locks().push(Lock {
		offset: 0,
		length: 10,
		write: false,
	});
	let status = fixture
		.table
		.validate(&mut compound, &free(&lock))
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_LOCKS_HELD);

	let status = fixture
		.table
		.validate(&mut compound, &free(&share))
		.unwrap_err();
	assert_eq!(status, nfsstat4::NFS4ERR_LOCKS_HELD);
}

#[test]
fn bump_seqid_skips_zero() {
	let fixture = Fixture::new();
	let client = fixture.client(1);
	let state = fixture.state(&client, StateType::Share, 0, 0);
	let mut compound = Compound::new(1);
	assert_eq!(state.bump_seqid(&mut compound).seqid, 1);
	state.seqid.store(ALL_ONES_SEQID, Ordering::SeqCst);
	let stateid = state.bump_seqid(&mut compound);
	assert_eq!(stateid.seqid, 1);
	assert_eq!(compound.current_stateid, stateid);
	assert!(compound.current_stateid_valid);
}

#[test]
fn display() {
	let fixture = Fixture::new();
	let client = fixture.client(3);
	let state = fixture.state(&client, StateType::Lock, 0, 6);
	assert_snapshot!(state.stateid(), @"OTHER=0x000000050000000300000001 {CLIENTID Epoch=0x00000005 Counter=0x00000003 StateIdCounter=0x00000001} seqid=6");
	assert_snapshot!(state, @"OTHER=0x000000050000000300000001 {CLIENTID Epoch=0x00000005 Counter=0x00000003 StateIdCounter=0x00000001} type=LOCK seqid=6");
	assert_snapshot!(ANONYMOUS_STATE_ID, @"OTHER=ALL-0 seqid=0");
	assert_snapshot!(READ_BYPASS_STATE_ID, @"OTHER=ALL-1 seqid=4294967295");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lookup_and_remove() {
	let fixture = Arc::new(Fixture::new());
	let client = fixture.client(1);
	let states = (0..64)
		.map(|_| *fixture.state(&client, StateType::Share, 0, 1).other())
		.collect::<Vec<_>>();

	let mut tasks = Vec::new();
	for other in states.iter().copied() {
		let remover = fixture.clone();
		tasks.push(tokio::spawn(async move {
			let held = remover.table.get(&other);
			remover.table.remove(&other);
			held.map(|state| *state.other())
		}));
		let validator = fixture.clone();
		tasks.push(tokio::spawn(async move {
			let mut compound = Compound::new(1);
			let stateid = stateid4 { seqid: 0, other };
			match validator.table.validate(&mut compound, &arg(stateid)) {
				Ok(validated) => validated.state().map(|state| *state.other()),
				Err(status) => {
					assert_eq!(status, nfsstat4::NFS4ERR_BAD_STATEID);
					None
				},
			}
		}));
	}
	for task in tasks {
		if let Some(other) = task.await.unwrap() {
			assert!(states.contains(&other));
		}
	}
	assert!(fixture.table.is_empty());
	assert_eq!(client.reservations(), 0);
}
