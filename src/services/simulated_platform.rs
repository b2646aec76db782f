//! services/simulated_platform.rs
//! Plataforma en memoria: modo "dry run" del servicio y doble de pruebas.
//! Todo destino se resuelve y toda acción tiene éxito salvo que se programe lo contrario.
//! Fuera de las pruebas no guarda estado por llamada.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::account_model::AccountSession;
use crate::models::campaign_model::TargetIdentity;
use crate::models::platform_model::{EntityHandle, PlatformError};
use crate::services::platform_client::{PlatformClient, PlatformConnector};

#[cfg(test)]
use tokio::time::Instant;

/// Ids sintéticos para handles y grupos, fuera del rango de ids de prueba.
const SYNTHETIC_ID_BASE: i64 = 1_000_000_000;

/// Llamadas registradas, para inspección.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    Connect { phone: String },
    Join { phone: String, group: String },
    Invite { phone: String, group_id: i64, user_id: i64 },
    SendMessage { phone: String, user_id: i64, text: String },
    ListMembers { phone: String, group_id: i64, offset: usize },
    Disconnect { phone: String },
}

#[derive(Debug, Default)]
struct SimState {
    groups: HashMap<String, EntityHandle>,
    members: HashMap<i64, Vec<EntityHandle>>,
    unknown_ids: HashSet<i64>,
    unknown_groups: HashSet<String>,
    failing_accounts: HashSet<String>,
    failing_joins: HashSet<String>,
    /// Respuestas programadas por id de entidad; se consumen en orden.
    replies: HashMap<i64, VecDeque<Result<(), PlatformError>>>,
    #[cfg(test)]
    calls: Vec<(Instant, PlatformCall)>,
}

impl SimState {
    fn next_reply(&mut self, entity_id: i64) -> Result<(), PlatformError> {
        self.replies
            .get_mut(&entity_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Ok(()))
    }

    #[cfg(test)]
    fn record(&mut self, call: PlatformCall) {
        self.calls.push((Instant::now(), call));
    }
}

/// Id estable derivado del nombre, sin guardar nada en memoria.
fn synthetic_id(name: &str) -> i64 {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    SYNTHETIC_ID_BASE + (hasher.finish() % SYNTHETIC_ID_BASE as u64) as i64
}

#[derive(Clone, Debug, Default)]
pub struct SimulatedPlatform {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Programación de respuestas e inspección de llamadas, usadas por las pruebas.
#[cfg(test)]
impl SimulatedPlatform {
    pub fn with_unknown_target(self, id: i64) -> Self {
        self.state().unknown_ids.insert(id);
        self
    }

    pub fn with_unknown_group(self, group: &str) -> Self {
        self.state().unknown_groups.insert(group.to_string());
        self
    }

    pub fn with_members(self, group: &str, members: Vec<EntityHandle>) -> Self {
        {
            let mut state = self.state();
            let group_handle = EntityHandle {
                username: Some(group.to_string()),
                ..EntityHandle::new(synthetic_id(group))
            };
            state.members.insert(group_handle.id, members);
            state.groups.insert(group.to_string(), group_handle);
        }
        self
    }

    pub fn with_member_ids(self, group: &str, member_ids: &[i64]) -> Self {
        let members = member_ids.iter().map(|id| EntityHandle::new(*id)).collect();
        self.with_members(group, members)
    }

    pub fn with_failing_account(self, phone: &str) -> Self {
        self.state().failing_accounts.insert(phone.to_string());
        self
    }

    pub fn with_failing_join(self, group: &str) -> Self {
        self.state().failing_joins.insert(group.to_string());
        self
    }

    /// Programa la respuesta del próximo invite/send dirigido a `entity_id`.
    pub fn script_reply(self, entity_id: i64, reply: Result<(), PlatformError>) -> Self {
        self.state()
            .replies
            .entry(entity_id)
            .or_default()
            .push_back(reply);
        self
    }

    pub fn group_id(&self, group: &str) -> i64 {
        self.state()
            .groups
            .get(group)
            .map(|g| g.id)
            .unwrap_or_else(|| synthetic_id(group))
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state().calls.iter().map(|(_, c)| c.clone()).collect()
    }

    /// Acciones salientes (invite + send) en orden, con su instante.
    pub fn outbound(&self) -> Vec<(i64, Instant)> {
        self.state()
            .calls
            .iter()
            .filter_map(|(at, c)| match c {
                PlatformCall::Invite { user_id, .. } => Some((*user_id, *at)),
                PlatformCall::SendMessage { user_id, .. } => Some((*user_id, *at)),
                _ => None,
            })
            .collect()
    }

    /// Cantidad de acciones salientes (invite + send) hacia `entity_id`.
    pub fn outbound_count(&self, entity_id: i64) -> usize {
        self.outbound()
            .iter()
            .filter(|(id, _)| *id == entity_id)
            .count()
    }
}

#[async_trait]
impl PlatformConnector for SimulatedPlatform {
    async fn connect(
        &self,
        account: &AccountSession,
    ) -> Result<Box<dyn PlatformClient>, PlatformError> {
        #[cfg(test)]
        self.state().record(PlatformCall::Connect {
            phone: account.phone.clone(),
        });
        if self.state().failing_accounts.contains(&account.phone) {
            return Err(PlatformError::Connection(format!(
                "session expired for {}",
                account.phone
            )));
        }
        log::debug!("(SimulatedPlatform) {} conectado (dry run)", account.phone);
        Ok(Box::new(SimulatedClient {
            phone: account.phone.clone(),
            platform: self.clone(),
        }))
    }
}

struct SimulatedClient {
    phone: String,
    platform: SimulatedPlatform,
}

#[async_trait]
impl PlatformClient for SimulatedClient {
    async fn resolve(&self, target: &TargetIdentity) -> Result<EntityHandle, PlatformError> {
        let state = self.platform.state();
        match target {
            TargetIdentity::Id(id) if state.unknown_ids.contains(id) => {
                Err(PlatformError::NotFound(id.to_string()))
            }
            TargetIdentity::Id(id) => Ok(EntityHandle::new(*id)),
            TargetIdentity::Handle(handle) => {
                // Un handle numérico que no se pudo resolver como id
                if handle
                    .parse::<i64>()
                    .map(|id| state.unknown_ids.contains(&id))
                    .unwrap_or(false)
                {
                    return Err(PlatformError::NotFound(handle.clone()));
                }
                Ok(EntityHandle {
                    username: Some(handle.clone()),
                    ..EntityHandle::new(synthetic_id(handle))
                })
            }
        }
    }

    async fn resolve_group(&self, group: &str) -> Result<EntityHandle, PlatformError> {
        let state = self.platform.state();
        if state.unknown_groups.contains(group) {
            return Err(PlatformError::NotFound(group.to_string()));
        }
        if let Some(entity) = state.groups.get(group) {
            return Ok(entity.clone());
        }
        Ok(EntityHandle {
            username: Some(group.to_string()),
            ..EntityHandle::new(synthetic_id(group))
        })
    }

    async fn join(&self, group: &str) -> Result<(), PlatformError> {
        #[cfg(test)]
        self.platform.state().record(PlatformCall::Join {
            phone: self.phone.clone(),
            group: group.to_string(),
        });
        let state = self.platform.state();
        if state.failing_joins.contains(group) || state.unknown_groups.contains(group) {
            return Err(PlatformError::Other(format!("cannot join {}", group)));
        }
        Ok(())
    }

    async fn invite(
        &self,
        group: &EntityHandle,
        users: &[EntityHandle],
    ) -> Result<(), PlatformError> {
        let mut state = self.platform.state();
        for user in users {
            #[cfg(test)]
            state.record(PlatformCall::Invite {
                phone: self.phone.clone(),
                group_id: group.id,
                user_id: user.id,
            });
            state.next_reply(user.id)?;
            log::debug!(
                "(SimulatedClient) {} invita {} a {} (dry run)",
                self.phone,
                user.id,
                group.id
            );
        }
        Ok(())
    }

    async fn send_message(&self, entity: &EntityHandle, text: &str) -> Result<(), PlatformError> {
        let mut state = self.platform.state();
        #[cfg(test)]
        state.record(PlatformCall::SendMessage {
            phone: self.phone.clone(),
            user_id: entity.id,
            text: text.to_string(),
        });
        state.next_reply(entity.id)?;
        log::debug!(
            "(SimulatedClient) {} -> {}: {} caracteres (dry run)",
            self.phone,
            entity.id,
            text.chars().count()
        );
        Ok(())
    }

    async fn list_members(
        &self,
        group: &EntityHandle,
        offset: usize,
        page_size: usize,
    ) -> Result<Vec<EntityHandle>, PlatformError> {
        #[cfg(test)]
        self.platform.state().record(PlatformCall::ListMembers {
            phone: self.phone.clone(),
            group_id: group.id,
            offset,
        });
        let state = self.platform.state();
        Ok(state
            .members
            .get(&group.id)
            .map(|members| members.iter().skip(offset).take(page_size).cloned().collect())
            .unwrap_or_default())
    }

    async fn disconnect(&self) {
        #[cfg(test)]
        self.platform.state().record(PlatformCall::Disconnect {
            phone: self.phone.clone(),
        });
        log::debug!("(SimulatedClient) {} desconectado", self.phone);
    }
}
