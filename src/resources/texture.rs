use std::sync::{Arc, RwLock};

/// Lifecycle of an asynchronously loaded image.
#[derive(Clone, Debug)]
pub enum AssetState {
    Pending,
    Ready(Arc<image::RgbaImage>),
    Failed(String),
}

/// Shared handle to a texture that may still be loading.
///
/// Clones observe the same state. Materials hold these; the renderer uploads
/// the image once it turns [`AssetState::Ready`] and keeps using the neutral
/// colour map while it is pending or failed.
#[derive(Clone)]
pub struct TextureRef {
    path: Arc<str>,
    state: Arc<RwLock<AssetState>>,
}

impl TextureRef {
    pub fn pending(path: &str) -> Self {
        Self {
            path: path.into(),
            state: Arc::new(RwLock::new(AssetState::Pending)),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> AssetState {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The decoded image, if it has arrived.
    pub fn image(&self) -> Option<Arc<image::RgbaImage>> {
        match self.state() {
            AssetState::Ready(img) => Some(img),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state(), AssetState::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state(), AssetState::Failed(_))
    }

    pub(crate) fn resolve(&self, result: anyhow::Result<image::RgbaImage>) {
        let next = match result {
            Ok(img) => {
                log::info!(
                    "Loaded texture {} ({}x{})",
                    self.path,
                    img.width(),
                    img.height()
                );
                AssetState::Ready(Arc::new(img))
            }
            Err(e) => {
                log::warn!("Texture {} could not be loaded: {:#}", self.path, e);
                AssetState::Failed(e.to_string())
            }
        };
        match self.state.write() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

impl std::fmt::Debug for TextureRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state() {
            AssetState::Pending => "pending",
            AssetState::Ready(_) => "ready",
            AssetState::Failed(_) => "failed",
        };
        f.debug_struct("TextureRef")
            .field("path", &self.path)
            .field("state", &state)
            .finish()
    }
}

/// Starts texture loads in the background and hands out [`TextureRef`]s.
#[derive(Clone, Debug)]
pub struct TextureLoader {
    #[cfg(not(target_arch = "wasm32"))]
    runtime: tokio::runtime::Handle,
}

impl TextureLoader {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self { runtime }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn new() -> Self {
        Self {}
    }

    /// Returns immediately; the reference resolves once the fetch finishes.
    pub fn load(&self, path: &str) -> TextureRef {
        let texture = TextureRef::pending(path);
        let handle = texture.clone();
        let path = path.to_string();
        let fut = async move {
            let result = fetch_image(&path).await;
            handle.resolve(result);
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            self.runtime.spawn(fut);
        }

        #[cfg(target_arch = "wasm32")]
        {
            wasm_bindgen_futures::spawn_local(fut);
        }

        texture
    }
}

pub async fn fetch_image(file_name: &str) -> anyhow::Result<image::RgbaImage> {
    let bytes = load_binary(file_name).await?;
    decode_image(&bytes)
}

pub fn decode_image(bytes: &[u8]) -> anyhow::Result<image::RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no browser window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page origin is not readable"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.error_for_status()?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(&path)
            .await
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?
    };

    Ok(data)
}
