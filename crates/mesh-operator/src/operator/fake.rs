//! In-memory cluster for multi-pass reconciliation tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use kube::ResourceExt;

use crate::error::{api_error, MeshOperatorResult};
use crate::k8s::{ChildKind, ChildObject};

use super::client::KubeClient;
use super::crd::Mesh;

type ChildKey = (ChildKind, String, String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetMesh(String, String),
    Exists(ChildKind, String),
    Create(ChildKind, String),
}

#[derive(Default)]
struct State {
    meshes: BTreeMap<(String, String), Mesh>,
    objects: BTreeMap<ChildKey, ChildObject>,
    calls: Vec<Call>,
    mesh_error: Option<(u16, String)>,
    exists_errors: BTreeMap<(ChildKind, String), (u16, String)>,
    create_errors: BTreeMap<(ChildKind, String), (u16, String)>,
    // Objects another writer creates right before our create lands.
    preempted: BTreeSet<(ChildKind, String)>,
}

#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn with_mesh(mesh: Mesh) -> Self {
        let cluster = Self::default();
        cluster.put_mesh(mesh);
        cluster
    }

    pub fn put_mesh(&self, mesh: Mesh) {
        let key = (mesh.namespace().unwrap_or_default(), mesh.name_any());
        self.state.lock().unwrap().meshes.insert(key, mesh);
    }

    pub fn insert(&self, child: ChildObject) {
        let key = (
            child.kind(),
            child.namespace().to_string(),
            child.name().to_string(),
        );
        self.state.lock().unwrap().objects.insert(key, child);
    }

    pub fn get(&self, kind: ChildKind, namespace: &str, name: &str) -> Option<ChildObject> {
        let key = (kind, namespace.to_string(), name.to_string());
        self.state.lock().unwrap().objects.get(&key).cloned()
    }

    pub fn objects(&self) -> Vec<ChildObject> {
        self.state.lock().unwrap().objects.values().cloned().collect()
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut self.state.lock().unwrap().calls)
    }

    pub fn fail_get_mesh(&self, code: u16, reason: &str) {
        self.state.lock().unwrap().mesh_error = Some((code, reason.to_string()));
    }

    pub fn fail_exists(&self, kind: ChildKind, name: &str, code: u16, reason: &str) {
        self.state
            .lock()
            .unwrap()
            .exists_errors
            .insert((kind, name.to_string()), (code, reason.to_string()));
    }

    pub fn fail_create(&self, kind: ChildKind, name: &str, code: u16, reason: &str) {
        self.state
            .lock()
            .unwrap()
            .create_errors
            .insert((kind, name.to_string()), (code, reason.to_string()));
    }

    pub fn preempt_create(&self, kind: ChildKind, name: &str) {
        self.state
            .lock()
            .unwrap()
            .preempted
            .insert((kind, name.to_string()));
    }
}

pub fn creates(calls: &[Call]) -> Vec<(ChildKind, String)> {
    calls
        .iter()
        .filter_map(|c| match c {
            Call::Create(kind, name) => Some((*kind, name.clone())),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl KubeClient for FakeCluster {
    async fn get_mesh(&self, namespace: &str, name: &str) -> MeshOperatorResult<Option<Mesh>> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::GetMesh(namespace.to_string(), name.to_string()));
        if let Some((code, reason)) = &state.mesh_error {
            return Err(api_error(*code, reason));
        }
        Ok(state
            .meshes
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn child_exists(
        &self,
        kind: ChildKind,
        namespace: &str,
        name: &str,
    ) -> MeshOperatorResult<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Exists(kind, name.to_string()));
        if let Some((code, reason)) = state.exists_errors.get(&(kind, name.to_string())) {
            return Err(api_error(*code, reason));
        }
        Ok(state
            .objects
            .contains_key(&(kind, namespace.to_string(), name.to_string())))
    }

    async fn create_child(&self, child: &ChildObject) -> MeshOperatorResult<()> {
        let mut state = self.state.lock().unwrap();
        let kind = child.kind();
        let name = child.name().to_string();
        state.calls.push(Call::Create(kind, name.clone()));

        if let Some((code, reason)) = state.create_errors.get(&(kind, name.clone())) {
            return Err(api_error(*code, reason));
        }

        let key = (kind, child.namespace().to_string(), name.clone());
        if state.preempted.remove(&(kind, name)) {
            state.objects.insert(key.clone(), child.clone());
        }
        if state.objects.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists"));
        }
        state.objects.insert(key, child.clone());
        Ok(())
    }
}
