pub mod collection;
pub mod remote;

pub use collection::{is_local_id, Collection, CreateCollection, UpdateCollection, LOCAL_ID_PREFIX};
pub use remote::{RemoteCollection, RemoteMember};
