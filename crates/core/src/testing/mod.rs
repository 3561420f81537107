//! Testing utilities and mock implementations.
//!
//! Doubles for every external seam so the scheduler and fetch pipeline can
//! be exercised without a live store or network.
//!
//! # Example
//!
//! ```rust,ignore
//! use followtrack_core::testing::{fixtures, MemoryStore, MockTransport};
//!
//! let store = MemoryStore::new();
//! store.set_targets(["alice", "bob"]).await;
//!
//! let transport = MockTransport::new();
//! transport.set_page("https://instagram.com/alice", 200, fixtures::profile_page(42)).await;
//! ```

mod memory_store;
mod mock_fetcher;
mod mock_transport;

pub use memory_store::{MemoryStore, RecordedWrite};
pub use mock_fetcher::{MockFetcher, RecordedFetch};
pub use mock_transport::MockTransport;

/// Test fixtures and helper functions.
pub mod fixtures {
    /// A profile page body carrying `count` between the two markers.
    pub fn profile_page(count: u64) -> String {
        format!(
            concat!(
                "<html><head><title>profile</title></head><body><script>",
                "window._sharedData = {{\"entry_data\":{{\"ProfilePage\":[{{\"graphql\":",
                "{{\"user\":{{\"biography\":\"\",\"edge_followed_by\":{{\"count\":{}}},",
                "\"followed_by_viewer\":false,\"edge_follow\":{{\"count\":12}}}}}}}}]}}}};",
                "</script></body></html>"
            ),
            count
        )
    }

    /// A page that loaded fine but carries no count.
    pub fn page_without_count() -> String {
        "<html><body><h1>Sorry, this page isn't available.</h1></body></html>".to_string()
    }
}
