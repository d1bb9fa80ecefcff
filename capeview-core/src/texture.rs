//! Texture references and the texture source resolver.
//!
//! A [`TextureRef`] is an opaque handle to image bytes: either a remote URL
//! or inline bytes (uploaded files, watched-file reads, generated
//! defaults). [`resolve`] rewrites URLs of known hostile-CORS hosts through
//! a public relay; everything else passes through untouched.

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};
use thiserror::Error;
use url::Url;

/// MIME type assumed for textures when the source does not say otherwise.
pub const PNG_MIME: &str = "image/png";

/// Public CORS passthrough, used only for the hosts below.
const RELAY_ENDPOINT: &str = "https://api.allorigins.win/raw";

/// Hosts that block direct cross-origin texture fetches.
const RELAY_HOSTS: &[&str] = &["namemc.com", "minecraft.net"];

// =============================================================================
// Texture References
// =============================================================================

/// Embedded image bytes with their MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct InlineTexture {
    pub mime: String,
    pub bytes: Arc<Vec<u8>>,
}

impl InlineTexture {
    /// Wrap raw PNG bytes.
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            mime: PNG_MIME.to_string(),
            bytes: Arc::new(bytes),
        }
    }
}

impl fmt::Debug for InlineTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineTexture")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Reference to image bytes: a remote URL or an embedded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureRef {
    /// An http(s) URL.
    Remote(String),
    /// Embedded bytes, loadable without network access.
    Inline(InlineTexture),
}

impl TextureRef {
    pub fn remote(url: impl Into<String>) -> Self {
        Self::Remote(url.into())
    }

    pub fn inline_png(bytes: Vec<u8>) -> Self {
        Self::Inline(InlineTexture::png(bytes))
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("texture fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("texture fetch returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("texture decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

// =============================================================================
// Resolver
// =============================================================================

/// Turn a texture reference into one that is loadable from this process.
///
/// Pure and total: inline references and URLs outside the relay allow-list
/// come back unchanged (unparsable URLs included); allow-listed hosts are
/// rewritten to the relay with the original URL percent-encoded as the
/// `url` query value.
pub fn resolve(texture: &TextureRef) -> TextureRef {
    let TextureRef::Remote(raw) = texture else {
        return texture.clone();
    };

    let Ok(parsed) = Url::parse(raw) else {
        return texture.clone();
    };
    let Some(host) = parsed.host_str() else {
        return texture.clone();
    };

    let hostile = RELAY_HOSTS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)));
    if !hostile {
        return texture.clone();
    }

    match Url::parse_with_params(RELAY_ENDPOINT, &[("url", raw.as_str())]) {
        Ok(relayed) => TextureRef::Remote(relayed.into()),
        Err(_) => texture.clone(),
    }
}

// =============================================================================
// Fetching
// =============================================================================

/// Resolve `texture` and produce its bytes plus MIME type.
///
/// Inline references never touch the network.
pub async fn fetch_bytes(
    client: &reqwest::Client,
    texture: &TextureRef,
) -> Result<(Vec<u8>, String), TextureError> {
    match resolve(texture) {
        TextureRef::Inline(inline) => Ok((inline.bytes.as_ref().clone(), inline.mime)),
        TextureRef::Remote(url) => {
            let response = client.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(TextureError::Status(status));
            }
            let mime = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
                .unwrap_or_else(|| PNG_MIME.to_string());
            let bytes = response.bytes().await?.to_vec();
            Ok((bytes, mime))
        }
    }
}

// =============================================================================
// Default Textures
// =============================================================================

/// The skin seeded at startup. Generated rather than shipped as an asset so
/// the default works offline.
pub fn default_skin() -> TextureRef {
    TextureRef::Inline(InlineTexture::png(encode_png(&blocked_texture(
        64,
        64,
        [0x3d, 0x8b, 0x74, 0xff],
        [0x2a, 0x61, 0x51, 0xff],
    ))))
}

/// The cape seeded at startup.
pub fn default_cape() -> TextureRef {
    TextureRef::Inline(InlineTexture::png(encode_png(&blocked_texture(
        64,
        32,
        [0x8c, 0x3a, 0x3a, 0xff],
        [0x5e, 0x26, 0x26, 0xff],
    ))))
}

fn blocked_texture(width: u32, height: u32, base: [u8; 4], accent: [u8; 4]) -> RgbaImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgba(base)
        } else {
            Rgba(accent)
        }
    })
}

fn encode_png(image: &RgbaImage) -> Vec<u8> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("encoding a generated image to PNG cannot fail");
    buffer
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Resolver Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_resolve_rewrites_allow_listed_hosts() {
        let original = TextureRef::remote("https://namemc.com/texture/abc123.png");
        let TextureRef::Remote(resolved) = resolve(&original) else {
            panic!("expected a remote ref");
        };
        assert_eq!(
            resolved,
            "https://api.allorigins.win/raw?url=https%3A%2F%2Fnamemc.com%2Ftexture%2Fabc123.png"
        );
    }

    #[test]
    fn test_resolve_matches_subdomains() {
        let original = TextureRef::remote("https://textures.minecraft.net/texture/abc");
        let TextureRef::Remote(resolved) = resolve(&original) else {
            panic!("expected a remote ref");
        };
        assert!(resolved.starts_with("https://api.allorigins.win/raw?url="));
        assert!(resolved.contains("textures.minecraft.net"));
    }

    #[test]
    fn test_resolve_is_identity_for_other_hosts() {
        let original = TextureRef::remote("https://example.com/skin.png");
        assert_eq!(resolve(&original), original);

        // A lookalike domain must not match the allow-list.
        let lookalike = TextureRef::remote("https://namemc.com.evil.org/skin.png");
        assert_eq!(resolve(&lookalike), lookalike);
    }

    #[test]
    fn test_resolve_is_identity_for_inline() {
        let original = TextureRef::inline_png(vec![1, 2, 3]);
        assert_eq!(resolve(&original), original);
    }

    #[test]
    fn test_resolve_is_identity_for_unparsable_urls() {
        let original = TextureRef::remote("not a url");
        assert_eq!(resolve(&original), original);
    }

    // -------------------------------------------------------------------------
    // Fetch Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_fetch_bytes_inline_skips_network() {
        let client = reqwest::Client::new();
        let texture = TextureRef::inline_png(vec![9, 9, 9]);
        let (bytes, mime) =
            tokio_test::block_on(fetch_bytes(&client, &texture)).expect("inline fetch");
        assert_eq!(bytes, vec![9, 9, 9]);
        assert_eq!(mime, PNG_MIME);
    }

    #[tokio::test]
    async fn test_fetch_bytes_reports_network_errors() {
        let client = reqwest::Client::new();
        let texture = TextureRef::remote("http://127.0.0.1:9/skin.png");
        let result = fetch_bytes(&client, &texture).await;
        assert!(matches!(result, Err(TextureError::Fetch(_))));
    }

    // -------------------------------------------------------------------------
    // Default Texture Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_default_textures_are_valid_png() {
        for texture in [default_skin(), default_cape()] {
            let TextureRef::Inline(inline) = texture else {
                panic!("defaults must be inline");
            };
            assert_eq!(inline.mime, PNG_MIME);
            let decoded = image::load_from_memory(&inline.bytes).expect("decodable PNG");
            assert!(decoded.width() > 0);
        }
    }

    #[test]
    fn test_default_skin_dimensions() {
        let TextureRef::Inline(inline) = default_skin() else {
            panic!("default skin must be inline");
        };
        let decoded = image::load_from_memory(&inline.bytes).expect("decodable PNG");
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
    }
}
