//! In-memory stand-in for the OS audio stack, for tests.
//!
//! Cloning a [`FakePlatform`] shares its state, so a test can keep one handle
//! for setup and assertions while another lives inside a session or thread.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    thread::{self, ThreadId},
};

use super::{
    AudioPlatform, DefaultEndpointWriter, DeviceState, Direction, EndpointCollection,
    EndpointDevice, EndpointEnumerator, PlatformError, PlatformResult, Role, RuntimeInit,
    StateMask,
};

// E_FAIL / E_NOTFOUND-ish codes, the values only matter for display
const E_FAIL: u32 = 0x8000_4005;
const E_NOTFOUND: u32 = 0x8007_0490;

#[derive(Debug, Clone)]
pub struct FakeEndpoint {
    pub id: String,
    pub name: String,
    pub direction: Direction,
    pub state: DeviceState,
    pub name_fails: bool,
    pub id_fails: bool,
    pub state_fails: bool,
}

impl FakeEndpoint {
    pub fn active(id: &str, name: &str, direction: Direction) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            direction,
            state: DeviceState::Active,
            name_fails: false,
            id_fails: false,
            state_fails: false,
        }
    }
    pub fn with_state(mut self, state: DeviceState) -> Self {
        self.state = state;
        self
    }
    pub fn with_broken_name(mut self) -> Self {
        self.name_fails = true;
        self
    }
    pub fn with_broken_id(mut self) -> Self {
        self.id_fails = true;
        self
    }
    pub fn with_broken_state(mut self) -> Self {
        self.state_fails = true;
        self
    }
}

/// Something the code under test asked the fake to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Initialize,
    Uninitialize,
    CreateEnumerator,
    CreatePolicyConfig,
    Enumerate(Direction, StateMask),
    SetDefault(String, Role),
}

#[derive(Debug, Default)]
pub struct FakeAudio {
    pub endpoints: Vec<FakeEndpoint>,
    pub defaults: HashMap<(Direction, Role), String>,
    pub calls: Vec<FakeCall>,
    /// Runtime is already up on the "thread", report `S_FALSE`.
    pub already_initialized: bool,
    pub init_fails: bool,
    pub enumerator_fails: bool,
    pub policy_config_fails: bool,
    pub enumeration_fails: bool,
    pub default_lookup_fails: bool,
    pub failing_role: Option<Role>,
    /// Runtime objects not yet released, per creating thread
    live: HashMap<ThreadId, usize>,
}

impl FakeAudio {
    pub fn live_objects(&self) -> usize {
        self.live.values().sum()
    }
    fn acquire(&mut self) {
        *self.live.entry(thread::current().id()).or_default() += 1;
    }
    fn release(&mut self) {
        if let Some(count) = self.live.get_mut(&thread::current().id()) {
            *count -= 1;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePlatform {
    state: Arc<Mutex<FakeAudio>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_endpoints(endpoints: Vec<FakeEndpoint>) -> Self {
        let platform = Self::new();
        platform.audio().endpoints = endpoints;
        platform
    }
    pub fn audio(&self) -> MutexGuard<'_, FakeAudio> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
    /// Sets `id` as the default for every role of `direction`, like a third party would.
    pub fn force_default(&self, direction: Direction, id: &str) {
        let mut audio = self.audio();
        for role in Role::ALL {
            audio.defaults.insert((direction, role), id.to_owned());
        }
    }
    pub fn default_for(&self, direction: Direction, role: Role) -> Option<String> {
        self.audio().defaults.get(&(direction, role)).cloned()
    }
    pub fn calls(&self) -> Vec<FakeCall> {
        self.audio().calls.clone()
    }
    pub fn clear_calls(&self) {
        self.audio().calls.clear();
    }
    pub fn set_default_calls(&self) -> Vec<(String, Role)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                FakeCall::SetDefault(id, role) => Some((id, role)),
                _ => None,
            })
            .collect()
    }
    pub fn count(&self, wanted: &FakeCall) -> usize {
        self.calls().iter().filter(|call| *call == wanted).count()
    }
    fn record(&self, call: FakeCall) {
        self.audio().calls.push(call);
    }
}

impl AudioPlatform for FakePlatform {
    type Enumerator = FakeEnumerator;
    type PolicyConfig = FakePolicyConfig;

    fn initialize(&self) -> PlatformResult<RuntimeInit> {
        self.record(FakeCall::Initialize);
        let audio = self.audio();
        if audio.init_fails {
            Err(PlatformError::new("Initialize", E_FAIL, "runtime unavailable"))
        } else if audio.already_initialized {
            Ok(RuntimeInit::AlreadyInitialized)
        } else {
            Ok(RuntimeInit::Initialized)
        }
    }
    fn create_enumerator(&self) -> PlatformResult<Self::Enumerator> {
        self.record(FakeCall::CreateEnumerator);
        let mut audio = self.audio();
        if audio.enumerator_fails {
            return Err(PlatformError::new(
                "CreateEnumerator",
                E_FAIL,
                "audio service not running",
            ));
        }
        audio.acquire();
        drop(audio);
        Ok(FakeEnumerator(self.clone()))
    }
    fn create_policy_config(&self) -> PlatformResult<Self::PolicyConfig> {
        self.record(FakeCall::CreatePolicyConfig);
        let mut audio = self.audio();
        if audio.policy_config_fails {
            return Err(PlatformError::new(
                "CreatePolicyConfig",
                E_FAIL,
                "class not registered",
            ));
        }
        audio.acquire();
        drop(audio);
        Ok(FakePolicyConfig(self.clone()))
    }
    fn uninitialize(&self) {
        self.record(FakeCall::Uninitialize);
        let audio = self.audio();
        let live_here = audio.live.get(&thread::current().id()).copied();
        assert_eq!(
            live_here.unwrap_or(0),
            0,
            "Runtime torn down with objects still alive on this thread"
        );
    }
}

pub struct FakeEnumerator(FakePlatform);

impl Drop for FakeEnumerator {
    fn drop(&mut self) {
        self.0.audio().release();
    }
}

impl EndpointEnumerator for FakeEnumerator {
    type Device = FakeDevice;
    type Collection = FakeCollection;

    /// Hands back every endpoint of the direction and ignores the mask, like a driver that lies.
    fn enum_endpoints(
        &self,
        direction: Direction,
        mask: StateMask,
    ) -> PlatformResult<Self::Collection> {
        self.0.record(FakeCall::Enumerate(direction, mask));
        let audio = self.0.audio();
        if audio.enumeration_fails {
            return Err(PlatformError::new("EnumEndpoints", E_FAIL, "enumeration failed"));
        }
        let devices = audio
            .endpoints
            .iter()
            .filter(|e| e.direction == direction)
            .cloned()
            .map(FakeDevice)
            .collect();
        Ok(FakeCollection(devices))
    }
    fn default_endpoint(&self, direction: Direction, role: Role) -> PlatformResult<Self::Device> {
        let audio = self.0.audio();
        if audio.default_lookup_fails {
            return Err(PlatformError::new("DefaultEndpoint", E_FAIL, "lookup failed"));
        }
        let id = audio
            .defaults
            .get(&(direction, role))
            .ok_or_else(|| PlatformError::new("DefaultEndpoint", E_NOTFOUND, "no default"))?;
        audio
            .endpoints
            .iter()
            .find(|e| &e.id == id)
            .cloned()
            .map(FakeDevice)
            .ok_or_else(|| PlatformError::new("DefaultEndpoint", E_NOTFOUND, "no such device"))
    }
}

pub struct FakeCollection(Vec<FakeDevice>);

impl EndpointCollection for FakeCollection {
    type Device = FakeDevice;

    fn count(&self) -> PlatformResult<u32> {
        Ok(self.0.len() as u32)
    }
    fn item(&self, index: u32) -> PlatformResult<Self::Device> {
        self.0
            .get(index as usize)
            .map(|d| FakeDevice(d.0.clone()))
            .ok_or_else(|| PlatformError::new("Item", E_NOTFOUND, "index out of range"))
    }
}

pub struct FakeDevice(FakeEndpoint);

impl EndpointDevice for FakeDevice {
    fn id(&self) -> PlatformResult<String> {
        if self.0.id_fails {
            return Err(PlatformError::new("GetId", E_FAIL, "id unavailable"));
        }
        Ok(self.0.id.clone())
    }
    fn state(&self) -> PlatformResult<DeviceState> {
        if self.0.state_fails {
            return Err(PlatformError::new("GetState", E_FAIL, "state unavailable"));
        }
        Ok(self.0.state)
    }
    fn friendly_name(&self) -> PlatformResult<String> {
        if self.0.name_fails {
            return Err(PlatformError::new("GetValue", E_FAIL, "property store unavailable"));
        }
        Ok(self.0.name.clone())
    }
}

pub struct FakePolicyConfig(FakePlatform);

impl Drop for FakePolicyConfig {
    fn drop(&mut self) {
        self.0.audio().release();
    }
}

impl DefaultEndpointWriter for FakePolicyConfig {
    fn set_default_endpoint(&self, endpoint_id: &str, role: Role) -> PlatformResult<()> {
        self.0
            .record(FakeCall::SetDefault(endpoint_id.to_owned(), role));
        let mut audio = self.0.audio();
        if audio.failing_role == Some(role) {
            return Err(PlatformError::new("SetDefaultEndpoint", E_FAIL, "access denied"));
        }
        let direction = audio
            .endpoints
            .iter()
            .find(|e| e.id == endpoint_id)
            .map(|e| e.direction)
            .ok_or_else(|| {
                PlatformError::new("SetDefaultEndpoint", E_NOTFOUND, "element not found")
            })?;
        audio
            .defaults
            .insert((direction, role), endpoint_id.to_owned());
        Ok(())
    }
}
