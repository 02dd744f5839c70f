//! Per-session synthetic browser environment.
//!
//! Each enrollment run draws its own fingerprint; values are never persisted
//! or reused verbatim across runs, so two enrollments cannot be linked by
//! their environment signals.

use rand::seq::SliceRandom;
use rand::Rng;

/// Common desktop resolutions. Small fixed pool on purpose: exotic sizes
/// are themselves a fingerprint.
const VIEWPORTS: &[(u32, u32)] = &[
    (1920, 1080),
    (1680, 1050),
    (1536, 864),
    (1440, 900),
    (1366, 768),
];

/// User-agent / platform pairs. The platform string must match the UA or
/// the mismatch is an immediate automation tell.
const USER_AGENTS: &[(&str, &str)] = &[
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        "Win32",
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        "MacIntel",
    ),
    (
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        "Linux x86_64",
    ),
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
        "Win32",
    ),
];

/// Session-consistent synthetic environment, drawn once at session start
/// and held for the run's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFingerprint {
    pub viewport: (u32, u32),
    pub user_agent: String,
    pub platform: String,
    pub timezone: String,
    pub locale: String,
    /// Per-session seed for the canvas perturbation, so readback is stable
    /// within a session but differs between sessions.
    pub canvas_seed: u32,
}

impl SessionFingerprint {
    /// Draw a fresh fingerprint. The timezone defaults to the synthetic
    /// identity's declared zone so the environment matches the person.
    pub fn draw(identity_timezone: &str) -> Self {
        let mut rng = rand::thread_rng();
        let viewport = *VIEWPORTS
            .choose(&mut rng)
            .unwrap_or(&(1920, 1080));
        let (ua, platform) = *USER_AGENTS
            .choose(&mut rng)
            .unwrap_or(&USER_AGENTS[0]);

        Self {
            viewport,
            user_agent: ua.to_string(),
            platform: platform.to_string(),
            timezone: identity_timezone.to_string(),
            locale: "en-US".to_string(),
            canvas_seed: rng.gen(),
        }
    }

    /// Page-load-time countermeasure script, installed once per session
    /// before any page script runs. Hides the automation flag, reports a
    /// non-empty plugin list and a consistent platform, and flips a single
    /// low bit in canvas pixel readback to break naive canvas hashing.
    pub fn countermeasure_script(&self) -> String {
        format!(
            r#"
Object.defineProperty(Object.getPrototypeOf(navigator), 'webdriver', {{
    get: () => false,
    configurable: true
}});

Object.defineProperty(Navigator.prototype, 'platform', {{
    get: () => '{platform}',
    configurable: true
}});

Object.defineProperty(Navigator.prototype, 'plugins', {{
    get: () => {{
        const p = [
            {{ name: 'PDF Viewer', filename: 'internal-pdf-viewer' }},
            {{ name: 'Chrome PDF Viewer', filename: 'internal-pdf-viewer' }},
            {{ name: 'Chromium PDF Viewer', filename: 'internal-pdf-viewer' }}
        ];
        p.item = i => p[i];
        p.namedItem = n => p.find(x => x.name === n) || null;
        return p;
    }},
    configurable: true
}});

Object.defineProperty(Navigator.prototype, 'languages', {{
    get: () => ['{locale}', 'en'],
    configurable: true
}});

const canvasSeed = {seed};
const origGetImageData = CanvasRenderingContext2D.prototype.getImageData;
CanvasRenderingContext2D.prototype.getImageData = function() {{
    const data = origGetImageData.apply(this, arguments);
    for (let i = 0; i < data.data.length; i += 4) {{
        data.data[i] ^= ((canvasSeed >> (i % 24)) & 1);
    }}
    return data;
}};
const origToDataURL = HTMLCanvasElement.prototype.toDataURL;
HTMLCanvasElement.prototype.toDataURL = function() {{
    const ctx = this.getContext('2d');
    if (ctx && this.width > 0 && this.height > 0) {{
        const d = origGetImageData.call(ctx, 0, 0, this.width, this.height);
        d.data[0] ^= (canvasSeed & 1);
        ctx.putImageData(d, 0, 0);
    }}
    return origToDataURL.apply(this, arguments);
}};
"#,
            platform = self.platform,
            locale = self.locale,
            seed = self.canvas_seed & 0x00ff_ffff,
        )
    }
}
