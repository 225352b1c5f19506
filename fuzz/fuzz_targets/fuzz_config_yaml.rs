#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary YAML must either fail to parse or produce a config whose
    // validation returns cleanly
    if let Ok(text) = std::str::from_utf8(data)
        && let Ok(config) = plumbum::Config::from_yaml_str(text)
    {
        let _ = config.validate();
        let _ = config.charging.default_mode.parse::<plumbum::ModeKind>();
    }
});
