use windows::{
    core::{PCWSTR, PWSTR},
    Win32::{
        Devices::FunctionDiscovery::PKEY_Device_FriendlyName,
        Foundation::{RPC_E_CHANGED_MODE, S_FALSE},
        Media::Audio::*,
        System::Com::{
            CoCreateInstance, CoInitializeEx, CoTaskMemFree, CoUninitialize,
            StructuredStorage::PropVariantClear, CLSCTX_ALL, COINIT_APARTMENTTHREADED, STGM_READ,
        },
        UI::Shell::PropertiesSystem::PropVariantToStringAlloc,
    },
};

use super::{
    AudioPlatform, DefaultEndpointWriter, DeviceState, Direction, EndpointCollection,
    EndpointDevice, EndpointEnumerator, PlatformError, PlatformResult, Role, RuntimeInit,
    StateMask,
};

use policy_config::{IPolicyConfig, PolicyConfig};

mod policy_config;

/// Core Audio (MMDevice API) through COM.
///
/// A unit handle: every interface it hands out belongs to the apartment of the thread that called
/// [`AudioPlatform::initialize`], and `windows-rs` interfaces are `!Send`, so they stay put.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreAudio;

impl AudioPlatform for CoreAudio {
    type Enumerator = CoreAudioEnumerator;
    type PolicyConfig = CoreAudioPolicy;

    fn initialize(&self) -> PlatformResult<RuntimeInit> {
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
        // Only S_FALSE means "already initialized in this mode".
        // RPC_E_CHANGED_MODE (thread is MTA) is an error, we can't use STA objects there.
        if hr == S_FALSE {
            Ok(RuntimeInit::AlreadyInitialized)
        } else if hr.is_ok() {
            Ok(RuntimeInit::Initialized)
        } else if hr == RPC_E_CHANGED_MODE {
            Err(PlatformError::new(
                "CoInitializeEx",
                hr.0 as u32,
                "thread already initialized with a different concurrency model",
            ))
        } else {
            Err(PlatformError::new(
                "CoInitializeEx",
                hr.0 as u32,
                hr.message().to_string(),
            ))
        }
    }
    fn create_enumerator(&self) -> PlatformResult<Self::Enumerator> {
        let enumerator: IMMDeviceEnumerator =
            unsafe { CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL) }
                .map_err(|e| win_error("CoCreateInstance(MMDeviceEnumerator)", e))?;
        Ok(CoreAudioEnumerator(enumerator))
    }
    fn create_policy_config(&self) -> PlatformResult<Self::PolicyConfig> {
        let policy_config: IPolicyConfig =
            unsafe { CoCreateInstance(&PolicyConfig, None, CLSCTX_ALL) }
                .map_err(|e| win_error("CoCreateInstance(PolicyConfig)", e))?;
        Ok(CoreAudioPolicy(policy_config))
    }
    fn uninitialize(&self) {
        // https://github.com/microsoft/windows-rs/issues/1169#issuecomment-926877227
        // Caller guarantees nothing from this apartment is still alive.
        unsafe { CoUninitialize() }
    }
}

pub struct CoreAudioEnumerator(IMMDeviceEnumerator);

impl EndpointEnumerator for CoreAudioEnumerator {
    type Device = CoreAudioDevice;
    type Collection = CoreAudioCollection;

    fn enum_endpoints(
        &self,
        direction: Direction,
        mask: StateMask,
    ) -> PlatformResult<Self::Collection> {
        let collection = unsafe {
            self.0
                .EnumAudioEndpoints(direction.into(), DEVICE_STATE(mask.0))
        }
        .map_err(|e| win_error("IMMDeviceEnumerator::EnumAudioEndpoints", e))?;
        Ok(CoreAudioCollection(collection))
    }
    fn default_endpoint(&self, direction: Direction, role: Role) -> PlatformResult<Self::Device> {
        let device = unsafe { self.0.GetDefaultAudioEndpoint(direction.into(), role.into()) }
            .map_err(|e| win_error("IMMDeviceEnumerator::GetDefaultAudioEndpoint", e))?;
        Ok(CoreAudioDevice(device))
    }
}

pub struct CoreAudioCollection(IMMDeviceCollection);

impl EndpointCollection for CoreAudioCollection {
    type Device = CoreAudioDevice;

    fn count(&self) -> PlatformResult<u32> {
        unsafe { self.0.GetCount() }.map_err(|e| win_error("IMMDeviceCollection::GetCount", e))
    }
    fn item(&self, index: u32) -> PlatformResult<Self::Device> {
        let device = unsafe { self.0.Item(index) }
            .map_err(|e| win_error("IMMDeviceCollection::Item", e))?;
        Ok(CoreAudioDevice(device))
    }
}

pub struct CoreAudioDevice(IMMDevice);

impl EndpointDevice for CoreAudioDevice {
    fn id(&self) -> PlatformResult<String> {
        let raw_id = unsafe { self.0.GetId() }.map_err(|e| win_error("IMMDevice::GetId", e))?;
        take_co_string("IMMDevice::GetId", raw_id)
    }
    fn state(&self) -> PlatformResult<DeviceState> {
        let state =
            unsafe { self.0.GetState() }.map_err(|e| win_error("IMMDevice::GetState", e))?;
        DeviceState::from_bits(state.0).ok_or_else(|| {
            PlatformError::new(
                "IMMDevice::GetState",
                state.0,
                "unexpected device state value",
            )
        })
    }
    fn friendly_name(&self) -> PlatformResult<String> {
        unsafe {
            let store = self
                .0
                .OpenPropertyStore(STGM_READ)
                .map_err(|e| win_error("IMMDevice::OpenPropertyStore", e))?;
            let mut prop = store
                .GetValue(&PKEY_Device_FriendlyName)
                .map_err(|e| win_error("IPropertyStore::GetValue", e))?;
            let converted = PropVariantToStringAlloc(&prop)
                .map_err(|e| win_error("PropVariantToStringAlloc", e));
            // Clear regardless of the conversion, the PROPVARIANT owns its own allocation
            let _ = PropVariantClear(&mut prop);
            take_co_string("PropVariantToStringAlloc", converted?)
        }
    }
}

pub struct CoreAudioPolicy(IPolicyConfig);

impl DefaultEndpointWriter for CoreAudioPolicy {
    fn set_default_endpoint(&self, endpoint_id: &str, role: Role) -> PlatformResult<()> {
        let wide_id = endpoint_id.to_wide();
        unsafe { self.0.SetDefaultEndpoint(wide_id.as_pcwstr(), role.into()) }
            .map_err(|e| win_error("IPolicyConfig::SetDefaultEndpoint", e))
    }
}

impl From<Direction> for EDataFlow {
    fn from(value: Direction) -> Self {
        match value {
            Direction::Render => eRender,
            Direction::Capture => eCapture,
        }
    }
}

impl From<Role> for ERole {
    fn from(value: Role) -> Self {
        match value {
            Role::Console => eConsole,
            Role::Multimedia => eMultimedia,
            Role::Communications => eCommunications,
        }
    }
}

fn win_error(operation: &'static str, error: windows_core::Error) -> PlatformError {
    PlatformError::new(operation, error.code().0 as u32, error.message().to_string())
}

/// Copies a `CoTaskMemAlloc`'d string out and frees the original, even if it isn't valid UTF-16.
fn take_co_string(operation: &'static str, raw: PWSTR) -> PlatformResult<String> {
    if raw.is_null() {
        return Err(PlatformError::new(operation, 0, "returned a null string"));
    }
    let converted = unsafe { raw.to_string() };
    unsafe { CoTaskMemFree(Some(raw.0 as *const _)) };
    converted.map_err(|e| PlatformError::new(operation, 0, e.to_string()))
}

// Yoinked from https://gist.github.com/dgellow/fb85229ee8aeabf3844a5f3d38eb445d

#[derive(Default)]
pub struct WideString(pub Vec<u16>);

pub trait ToWide {
    fn to_wide(&self) -> WideString;
}

impl ToWide for &str {
    fn to_wide(&self) -> WideString {
        let mut result: Vec<u16> = self.encode_utf16().collect();
        result.push(0);
        WideString(result)
    }
}

impl WideString {
    pub fn as_pcwstr(&self) -> PCWSTR {
        PCWSTR(self.0.as_ptr())
    }
}
