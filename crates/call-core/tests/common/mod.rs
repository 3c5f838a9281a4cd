//! In-memory call registry shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use callsync_call_core::{
    CallId, CallRegistry, CallSnapshot, CallStatus, CallType, LeaveOutcome, ParticipantId,
    ParticipantRole, ParticipantStatus, ParticipantView, PresenceStatus, RegistryError,
    RegistryResult, UserId, UserPresence, UserRef,
};

#[derive(Default)]
struct Inner {
    calls: HashMap<CallId, CallSnapshot>,
    next_id: u32,
    fail_create: Option<RegistryError>,
    fail_join: Option<RegistryError>,
    fail_leave: Option<RegistryError>,
    gate_create: bool,
    log: Vec<String>,
}

/// Registry acting on behalf of `local_user`
pub struct FakeRegistry {
    local_user: UserId,
    inner: Mutex<Inner>,
    create_gate: Notify,
}

impl FakeRegistry {
    pub fn new(local_user: &str) -> Self {
        Self {
            local_user: UserId::from(local_user),
            inner: Mutex::new(Inner::default()),
            create_gate: Notify::new(),
        }
    }

    pub fn fail_create(self, error: RegistryError) -> Self {
        self.inner.lock().unwrap().fail_create = Some(error);
        self
    }

    pub fn fail_join(self, error: RegistryError) -> Self {
        self.inner.lock().unwrap().fail_join = Some(error);
        self
    }

    pub fn fail_leave(self, error: RegistryError) -> Self {
        self.inner.lock().unwrap().fail_leave = Some(error);
        self
    }

    /// Hold create_call until [`FakeRegistry::release_create`]
    pub fn gated(self) -> Self {
        self.inner.lock().unwrap().gate_create = true;
        self
    }

    pub fn release_create(&self) {
        self.create_gate.notify_one();
    }

    /// Seed a call started by someone else that includes the local user
    pub fn seed_call(&self, id: &str, initiator: &str) -> CallSnapshot {
        let call = CallSnapshot {
            id: CallId::from(id),
            call_type: CallType::Audio,
            status: CallStatus::Pending,
            initiator_id: UserId::from(initiator),
            initiator: Some(UserRef::new(initiator)),
            participants: vec![
                row(initiator, ParticipantRole::Host, ParticipantStatus::Connected, PresenceStatus::Online),
                row(
                    self.local_user.as_str(),
                    ParticipantRole::Participant,
                    ParticipantStatus::Calling,
                    PresenceStatus::Online,
                ),
            ],
            started_at: None,
            ended_at: None,
            duration: None,
        };
        self.inner
            .lock()
            .unwrap()
            .calls
            .insert(call.id.clone(), call.clone());
        call
    }

    pub fn log(&self) -> Vec<String> {
        self.inner.lock().unwrap().log.clone()
    }

    pub fn call(&self, id: &str) -> Option<CallSnapshot> {
        self.inner.lock().unwrap().calls.get(&CallId::from(id)).cloned()
    }
}

pub fn row(user: &str, role: ParticipantRole, status: ParticipantStatus, presence: PresenceStatus) -> ParticipantView {
    ParticipantView {
        id: ParticipantId::from(format!("p-{}", user)),
        user_id: UserId::from(user),
        role,
        status,
        user: UserPresence { status: presence },
    }
}

#[async_trait]
impl CallRegistry for FakeRegistry {
    async fn create_call(&self, receiver_ids: &[UserId], call_type: CallType) -> RegistryResult<CallSnapshot> {
        let gated = self.inner.lock().unwrap().gate_create;
        if gated {
            self.create_gate.notified().await;
        }

        let mut inner = self.inner.lock().unwrap();
        inner.log.push("create".to_string());
        if let Some(error) = inner.fail_create.clone() {
            return Err(error);
        }

        inner.next_id += 1;
        let mut participants = vec![row(
            self.local_user.as_str(),
            ParticipantRole::Host,
            ParticipantStatus::Connected,
            PresenceStatus::Online,
        )];
        participants.extend(receiver_ids.iter().map(|id| {
            row(
                id.as_str(),
                ParticipantRole::Participant,
                ParticipantStatus::Calling,
                PresenceStatus::Offline,
            )
        }));

        let call = CallSnapshot {
            id: CallId::new(format!("call-{}", inner.next_id)),
            call_type,
            status: CallStatus::Pending,
            initiator_id: self.local_user.clone(),
            initiator: Some(UserRef::new(self.local_user.clone())),
            participants,
            started_at: None,
            ended_at: None,
            duration: None,
        };
        inner.calls.insert(call.id.clone(), call.clone());
        Ok(call)
    }

    async fn join_call(&self, call_id: &CallId) -> RegistryResult<CallSnapshot> {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push(format!("join {}", call_id));
        if let Some(error) = inner.fail_join.clone() {
            return Err(error);
        }

        let local_user = self.local_user.clone();
        let call = inner
            .calls
            .get_mut(call_id)
            .ok_or_else(|| RegistryError::rejected(404, "Call not found"))?;
        if call.is_ended() {
            return Err(RegistryError::rejected(400, "Cannot join ended call"));
        }
        for p in call.participants.iter_mut().filter(|p| p.user_id == local_user) {
            p.status = ParticipantStatus::Connected;
        }
        call.status = CallStatus::Active;
        Ok(call.clone())
    }

    async fn leave_call(&self, call_id: &CallId) -> RegistryResult<LeaveOutcome> {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push(format!("leave {}", call_id));
        if let Some(error) = inner.fail_leave.clone() {
            return Err(error);
        }

        let local_user = self.local_user.clone();
        let call = inner
            .calls
            .get_mut(call_id)
            .ok_or_else(|| RegistryError::rejected(404, "Call not found"))?;
        for p in call.participants.iter_mut().filter(|p| p.user_id == local_user) {
            p.status = ParticipantStatus::Disconnected;
        }
        let call_ended = call
            .participants
            .iter()
            .all(|p| p.status != ParticipantStatus::Connected);
        if call_ended {
            call.status = CallStatus::Ended;
        }
        Ok(LeaveOutcome {
            call: Some(call.clone()),
            call_ended,
        })
    }

    async fn update_participant_status(
        &self,
        call_id: &CallId,
        status: ParticipantStatus,
    ) -> RegistryResult<CallSnapshot> {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push(format!("update {} {:?}", call_id, status));

        let local_user = self.local_user.clone();
        let call = inner
            .calls
            .get_mut(call_id)
            .ok_or_else(|| RegistryError::rejected(404, "Call not found"))?;
        for p in call.participants.iter_mut().filter(|p| p.user_id == local_user) {
            p.status = status;
        }
        Ok(call.clone())
    }
}
