//! Kubernetes-backed object store
//!
//! Backup and Restore are custom resources with no generated Rust types, so
//! they go through `DynamicObject` with an `ApiResource` built from the
//! configured group and version.

use async_trait::async_trait;
use kube::{
    api::{Api, DeleteParams, DynamicObject, PostParams, PropagationPolicy},
    core::{GroupVersionKind, TypeMeta},
    discovery::ApiResource,
};
use stowage_core::{OperationKind, OperationResource, OperationSettings};

use super::{ObjectStore, ResourceKey};
use crate::error::{KubeError, Result};

/// Object store talking to the cluster's API server
pub struct KubeObjectStore {
    client: kube::Client,
    group: String,
    version: String,
}

impl KubeObjectStore {
    /// Create a store using the group/version from settings
    pub fn new(client: kube::Client, settings: &OperationSettings) -> Self {
        Self {
            client,
            group: settings.api_group().to_string(),
            version: settings.api_version_only().to_string(),
        }
    }

    /// Create a store from the ambient kubeconfig or in-cluster config
    pub async fn try_default(settings: &OperationSettings) -> Result<Self> {
        let client = kube::Client::try_default().await?;
        Ok(Self::new(client, settings))
    }

    fn api_resource(&self, kind: OperationKind) -> ApiResource {
        let gvk = GroupVersionKind::gvk(&self.group, &self.version, kind.as_str());
        ApiResource::from_gvk_with_plural(&gvk, kind.plural())
    }

    fn api(&self, kind: OperationKind, namespace: &str) -> (Api<DynamicObject>, ApiResource) {
        let ar = self.api_resource(kind);
        let api = Api::namespaced_with(self.client.clone(), namespace, &ar);
        (api, ar)
    }
}

fn to_dynamic(resource: &OperationResource) -> Result<DynamicObject> {
    Ok(serde_json::from_value(serde_json::to_value(resource)?)?)
}

fn from_dynamic(mut obj: DynamicObject, ar: &ApiResource) -> Result<OperationResource> {
    // List and watch responses may omit the type meta
    if obj.types.is_none() {
        obj.types = Some(TypeMeta {
            api_version: ar.api_version.clone(),
            kind: ar.kind.clone(),
        });
    }
    Ok(serde_json::from_value(serde_json::to_value(obj)?)?)
}

fn api_code(e: &kube::Error) -> Option<u16> {
    match e {
        kube::Error::Api(resp) => Some(resp.code),
        _ => None,
    }
}

#[async_trait]
impl ObjectStore for KubeObjectStore {
    async fn create(&self, resource: &OperationResource) -> Result<OperationResource> {
        let key = ResourceKey::of(resource);
        let (api, ar) = self.api(key.kind, &key.namespace);
        let obj = to_dynamic(resource)?;

        match api.create(&PostParams::default(), &obj).await {
            Ok(created) => {
                tracing::debug!(kind = %key.kind, resource = %key.name, namespace = %key.namespace, "created custom resource");
                from_dynamic(created, &ar)
            }
            Err(e) if api_code(&e) == Some(409) => Err(KubeError::ResourceAlreadyExists {
                kind: key.kind,
                name: key.name,
                namespace: key.namespace,
            }),
            Err(e) => Err(KubeError::Api(e)),
        }
    }

    async fn get(&self, key: &ResourceKey) -> Result<OperationResource> {
        let (api, ar) = self.api(key.kind, &key.namespace);

        match api.get(&key.name).await {
            Ok(obj) => from_dynamic(obj, &ar),
            Err(e) if api_code(&e) == Some(404) => Err(KubeError::ResourceNotFound {
                kind: key.kind,
                name: key.name.clone(),
                namespace: key.namespace.clone(),
            }),
            Err(e) => Err(KubeError::Api(e)),
        }
    }

    async fn delete(&self, key: &ResourceKey) -> Result<()> {
        let (api, _) = self.api(key.kind, &key.namespace);
        let params = DeleteParams {
            propagation_policy: Some(PropagationPolicy::Background),
            ..Default::default()
        };

        match api.delete(&key.name, &params).await {
            Ok(_) => Ok(()),
            Err(e) if api_code(&e) == Some(404) => Err(KubeError::ResourceNotFound {
                kind: key.kind,
                name: key.name.clone(),
                namespace: key.namespace.clone(),
            }),
            Err(e) => Err(KubeError::Api(e)),
        }
    }
}
