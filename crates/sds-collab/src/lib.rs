//! Narrow collaborator traits the pipeline executor is wired against, plus
//! in-memory fakes used by tests. Production implementations (real object
//! store, grid archive SSH/SFTP host, catalog database, waveform analysis
//! service, FDSNWS inventory) live outside this crate; this crate only
//! defines the seam.

use std::collections::HashMap;
use std::sync::Mutex;

use sds_descriptor::Descriptor;

#[derive(Debug, thiserror::Error)]
pub enum CollabError {
    #[error("object store error: {0}")]
    ObjectStore(String),
    #[error("grid archive error: {0}")]
    GridArchive(String),
    #[error("catalog store error: {0}")]
    CatalogStore(String),
    #[error("waveform analysis error: {0}")]
    WaveformAnalysis(String),
    #[error("inventory service error: {0}")]
    Inventory(String),
    #[error("deletion ledger error: {0}")]
    Ledger(String),
}

/// A catalog document: an opaque JSON object keyed by whatever fields the
/// waveform-analysis service produces (checksum, checksum_prev,
/// checksum_next, etc.).
pub type Document = serde_json::Value;

/// Named catalog collections, per spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    WfCatalogDaily,
    WfCatalogSegments,
    DublinCore,
    Ppsd,
}

/// A resolved station location, as returned by the FDSNWS inventory service.
#[derive(Debug, Clone, PartialEq)]
pub struct StationLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

pub trait ObjectStore: Send + Sync {
    fn exists(&self, descriptor: &Descriptor) -> Result<bool, CollabError>;
    fn checksum(&self, descriptor: &Descriptor) -> Result<Option<String>, CollabError>;
    fn put(&self, descriptor: &Descriptor, checksum: &str) -> Result<(), CollabError>;
    fn delete(&self, descriptor: &Descriptor) -> Result<(), CollabError>;
    fn get(&self, descriptor: &Descriptor, destination: &std::path::Path) -> Result<(), CollabError>;
}

pub trait GridArchive: Send + Sync {
    fn exists(&self, descriptor: &Descriptor) -> Result<bool, CollabError>;
    fn get_data_object(&self, descriptor: &Descriptor) -> Result<Vec<u8>, CollabError>;
    fn put(&self, descriptor: &Descriptor, bytes: &[u8]) -> Result<(), CollabError>;
    fn delete(&self, descriptor: &Descriptor) -> Result<(), CollabError>;
    fn assign_pid(&self, descriptor: &Descriptor) -> Result<String, CollabError>;
    fn get_pid(&self, descriptor: &Descriptor) -> Result<Option<String>, CollabError>;
    fn replicate(&self, descriptor: &Descriptor, remote_root: &str) -> Result<(), CollabError>;
    fn federated_exists(&self, descriptor: &Descriptor, remote_root: &str) -> Result<bool, CollabError>;
    fn federated_get_pid(&self, descriptor: &Descriptor, remote_root: &str) -> Result<Option<String>, CollabError>;
}

pub trait CatalogStore: Send + Sync {
    fn find_one(&self, collection: Collection, file_id: &str) -> Result<Option<Document>, CollabError>;
    fn find_many(&self, collection: Collection, file_id: &str) -> Result<Vec<Document>, CollabError>;
    fn save(&self, collection: Collection, doc: Document, overwrite: bool) -> Result<(), CollabError>;
    fn delete_many(&self, collection: Collection, file_id: &str) -> Result<(), CollabError>;
}

pub trait WaveformAnalysis: Send + Sync {
    fn quality_metadata(&self, descriptor: &Descriptor) -> Result<Document, CollabError>;
    fn ppsd_segments(&self, descriptor: &Descriptor) -> Result<Vec<Document>, CollabError>;
}

pub trait InventoryService: Send + Sync {
    fn station_location(&self, descriptor: &Descriptor) -> Result<Option<StationLocation>, CollabError>;
}

/// The durable set of filenames pending deletion (spec.md §4.6). Implemented
/// by `sds-ledger`; only the narrow seam lives here so `sds-rules` can drive
/// the terminal `remove_from_deletion_ledger` action without depending on
/// the SQLite-backed crate directly.
pub trait DeletionLedger: Send + Sync {
    fn remove(&self, filename: &str) -> Result<(), CollabError>;
}

/// Dependency-injection bundle threaded through the executor constructor.
pub struct Collaborators {
    pub object_store: Box<dyn ObjectStore>,
    pub grid_archive: Box<dyn GridArchive>,
    pub catalog_store: Box<dyn CatalogStore>,
    pub waveform_analysis: Box<dyn WaveformAnalysis>,
    pub inventory_service: Box<dyn InventoryService>,
    pub deletion_ledger: Box<dyn DeletionLedger>,
}

/// In-memory fakes, for executor and rule-action tests.
pub mod fakes {
    use super::*;

    #[derive(Default)]
    pub struct FakeObjectStore {
        state: Mutex<HashMap<String, String>>,
    }

    impl ObjectStore for FakeObjectStore {
        fn exists(&self, descriptor: &Descriptor) -> Result<bool, CollabError> {
            Ok(self.state.lock().unwrap().contains_key(&descriptor.filename()))
        }

        fn checksum(&self, descriptor: &Descriptor) -> Result<Option<String>, CollabError> {
            Ok(self.state.lock().unwrap().get(&descriptor.filename()).cloned())
        }

        fn put(&self, descriptor: &Descriptor, checksum: &str) -> Result<(), CollabError> {
            self.state
                .lock()
                .unwrap()
                .insert(descriptor.filename(), checksum.to_string());
            Ok(())
        }

        fn delete(&self, descriptor: &Descriptor) -> Result<(), CollabError> {
            self.state.lock().unwrap().remove(&descriptor.filename());
            Ok(())
        }

        fn get(&self, _descriptor: &Descriptor, _destination: &std::path::Path) -> Result<(), CollabError> {
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct FakeGridArchive {
        objects: Mutex<HashMap<String, Vec<u8>>>,
        pids: Mutex<HashMap<String, String>>,
        replicas: Mutex<HashMap<String, Vec<String>>>,
        next_pid: Mutex<u64>,
    }

    impl GridArchive for FakeGridArchive {
        fn exists(&self, descriptor: &Descriptor) -> Result<bool, CollabError> {
            Ok(self.objects.lock().unwrap().contains_key(&descriptor.filename()))
        }

        fn get_data_object(&self, descriptor: &Descriptor) -> Result<Vec<u8>, CollabError> {
            self.objects
                .lock()
                .unwrap()
                .get(&descriptor.filename())
                .cloned()
                .ok_or_else(|| CollabError::GridArchive(format!("no such object: {}", descriptor.filename())))
        }

        fn put(&self, descriptor: &Descriptor, bytes: &[u8]) -> Result<(), CollabError> {
            self.objects
                .lock()
                .unwrap()
                .insert(descriptor.filename(), bytes.to_vec());
            Ok(())
        }

        fn delete(&self, descriptor: &Descriptor) -> Result<(), CollabError> {
            self.objects.lock().unwrap().remove(&descriptor.filename());
            Ok(())
        }

        fn assign_pid(&self, descriptor: &Descriptor) -> Result<String, CollabError> {
            let mut next = self.next_pid.lock().unwrap();
            *next += 1;
            let pid = format!("hdl:fake/{}", *next);
            self.pids.lock().unwrap().insert(descriptor.filename(), pid.clone());
            Ok(pid)
        }

        fn get_pid(&self, descriptor: &Descriptor) -> Result<Option<String>, CollabError> {
            Ok(self.pids.lock().unwrap().get(&descriptor.filename()).cloned())
        }

        fn replicate(&self, descriptor: &Descriptor, remote_root: &str) -> Result<(), CollabError> {
            self.replicas
                .lock()
                .unwrap()
                .entry(descriptor.filename())
                .or_default()
                .push(remote_root.to_string());
            Ok(())
        }

        fn federated_exists(&self, descriptor: &Descriptor, remote_root: &str) -> Result<bool, CollabError> {
            Ok(self
                .replicas
                .lock()
                .unwrap()
                .get(&descriptor.filename())
                .is_some_and(|roots| roots.iter().any(|r| r == remote_root)))
        }

        fn federated_get_pid(&self, descriptor: &Descriptor, remote_root: &str) -> Result<Option<String>, CollabError> {
            if self.federated_exists(descriptor, remote_root)? {
                self.get_pid(descriptor)
            } else {
                Ok(None)
            }
        }
    }

    #[derive(Default)]
    pub struct FakeCatalogStore {
        documents: Mutex<HashMap<(u8, String), Vec<Document>>>,
    }

    fn collection_key(collection: Collection) -> u8 {
        match collection {
            Collection::WfCatalogDaily => 0,
            Collection::WfCatalogSegments => 1,
            Collection::DublinCore => 2,
            Collection::Ppsd => 3,
        }
    }

    impl CatalogStore for FakeCatalogStore {
        fn find_one(&self, collection: Collection, file_id: &str) -> Result<Option<Document>, CollabError> {
            Ok(self
                .documents
                .lock()
                .unwrap()
                .get(&(collection_key(collection), file_id.to_string()))
                .and_then(|docs| docs.first().cloned()))
        }

        fn find_many(&self, collection: Collection, file_id: &str) -> Result<Vec<Document>, CollabError> {
            Ok(self
                .documents
                .lock()
                .unwrap()
                .get(&(collection_key(collection), file_id.to_string()))
                .cloned()
                .unwrap_or_default())
        }

        fn save(&self, collection: Collection, doc: Document, overwrite: bool) -> Result<(), CollabError> {
            let file_id = doc
                .get("file_id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| CollabError::CatalogStore("document missing 'file_id'".to_string()))?
                .to_string();
            let mut documents = self.documents.lock().unwrap();
            let key = (collection_key(collection), file_id);
            if overwrite {
                documents.insert(key, vec![doc]);
            } else {
                documents.entry(key).or_default().push(doc);
            }
            Ok(())
        }

        fn delete_many(&self, collection: Collection, file_id: &str) -> Result<(), CollabError> {
            self.documents
                .lock()
                .unwrap()
                .remove(&(collection_key(collection), file_id.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct FakeWaveformAnalysis {
        pub ppsd_segment_count: usize,
    }

    impl WaveformAnalysis for FakeWaveformAnalysis {
        fn quality_metadata(&self, descriptor: &Descriptor) -> Result<Document, CollabError> {
            Ok(serde_json::json!({
                "file_id": descriptor.filename(),
                "checksum": descriptor.checksum().ok().flatten(),
            }))
        }

        fn ppsd_segments(&self, descriptor: &Descriptor) -> Result<Vec<Document>, CollabError> {
            Ok((0..self.ppsd_segment_count)
                .map(|i| {
                    serde_json::json!({
                        "file_id": descriptor.filename(),
                        "segment": i,
                        "checksum": "deadbeef",
                        "checksum_prev": "deadbeef",
                        "checksum_next": "deadbeef",
                    })
                })
                .collect())
        }
    }

    #[derive(Default)]
    pub struct FakeInventoryService {
        pub locations: Mutex<HashMap<String, StationLocation>>,
    }

    impl InventoryService for FakeInventoryService {
        fn station_location(&self, descriptor: &Descriptor) -> Result<Option<StationLocation>, CollabError> {
            Ok(self
                .locations
                .lock()
                .unwrap()
                .get(&format!("{}.{}", descriptor.network(), descriptor.station()))
                .cloned())
        }
    }

    #[derive(Default)]
    pub struct FakeDeletionLedger {
        pub removed: Mutex<Vec<String>>,
    }

    impl DeletionLedger for FakeDeletionLedger {
        fn remove(&self, filename: &str) -> Result<(), CollabError> {
            self.removed.lock().unwrap().push(filename.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use sds_descriptor::Descriptor;

    fn descriptor() -> Descriptor {
        Descriptor::new("NL.HGN.02.BHZ.D.1970.001", "/tmp/SDS").unwrap()
    }

    #[test]
    fn fake_object_store_round_trips() {
        let store = FakeObjectStore::default();
        let d = descriptor();
        assert!(!store.exists(&d).unwrap());
        store.put(&d, "sha2:abc").unwrap();
        assert!(store.exists(&d).unwrap());
        assert_eq!(store.checksum(&d).unwrap(), Some("sha2:abc".to_string()));
        store.delete(&d).unwrap();
        assert!(!store.exists(&d).unwrap());
    }

    #[test]
    fn fake_grid_archive_tracks_pid_and_replication() {
        let grid = FakeGridArchive::default();
        let d = descriptor();
        assert!(grid.get_pid(&d).unwrap().is_none());
        let pid = grid.assign_pid(&d).unwrap();
        assert_eq!(grid.get_pid(&d).unwrap(), Some(pid));

        assert!(!grid.federated_exists(&d, "remote-a").unwrap());
        grid.replicate(&d, "remote-a").unwrap();
        assert!(grid.federated_exists(&d, "remote-a").unwrap());
        assert!(!grid.federated_exists(&d, "remote-b").unwrap());
    }

    #[test]
    fn fake_catalog_store_overwrite_vs_append() {
        let catalog = FakeCatalogStore::default();
        let doc = serde_json::json!({"file_id": "x", "v": 1});
        catalog.save(Collection::WfCatalogDaily, doc.clone(), true).unwrap();
        catalog
            .save(Collection::WfCatalogDaily, serde_json::json!({"file_id": "x", "v": 2}), false)
            .unwrap();
        assert_eq!(catalog.find_many(Collection::WfCatalogDaily, "x").unwrap().len(), 2);

        catalog
            .save(Collection::WfCatalogDaily, serde_json::json!({"file_id": "x", "v": 3}), true)
            .unwrap();
        assert_eq!(catalog.find_many(Collection::WfCatalogDaily, "x").unwrap().len(), 1);
    }
}
