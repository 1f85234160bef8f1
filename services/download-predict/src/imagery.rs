//! Raster retrieval from an XYZ imagery endpoint.

use std::io::Cursor;

use futures::{StreamExt, TryStreamExt, stream};
use image::ImageFormat;
use redact::Secret;
use slippy::{Quadrant, Tile};
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageryMode {
    /// One request per tile.
    Tile,
    /// One request per tile returning its four children as a single raster.
    Supertile,
}

/// Encoded raster bytes for one tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub tile: Tile,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct ImageryFetcher {
    client: reqwest::Client,
    template: Secret<String>,
    concurrency: usize,
}

impl ImageryFetcher {
    pub fn new(client: reqwest::Client, template: Secret<String>) -> Self {
        ImageryFetcher {
            client,
            template,
            concurrency: 1,
        }
    }

    /// Number of requests in flight at once; results keep input order regardless.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Expands the template for `tile`. The result may hold a token; keep it out of logs.
    pub fn url(&self, tile: &Tile) -> String {
        self.template
            .expose_secret()
            .replace("{x}", &tile.x().to_string())
            .replace("{y}", &tile.y().to_string())
            .replace("{z}", &tile.z().to_string())
    }

    pub async fn fetch(&self, mode: ImageryMode, tiles: &[Tile]) -> Result<Vec<Raster>> {
        match mode {
            ImageryMode::Tile => self.fetch_tiles(tiles).await,
            ImageryMode::Supertile => self.fetch_supertiles(tiles).await,
        }
    }

    pub async fn fetch_tiles(&self, tiles: &[Tile]) -> Result<Vec<Raster>> {
        stream::iter(tiles)
            .map(|tile| async move {
                let bytes = self.fetch_raster(tile).await?;
                Ok::<_, Error>(Raster { tile: *tile, bytes })
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    /// Yields four child rasters per input tile, in [`Quadrant::ALL`] order.
    pub async fn fetch_supertiles(&self, tiles: &[Tile]) -> Result<Vec<Raster>> {
        let parents: Vec<[Raster; 4]> = stream::iter(tiles)
            .map(|tile| async move {
                let bytes = self.fetch_raster(tile).await?;
                split_supertile(tile, &bytes)
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;
        Ok(parents.into_iter().flatten().collect())
    }

    async fn fetch_raster(&self, tile: &Tile) -> Result<Vec<u8>> {
        debug!(%tile, "fetching imagery");
        let res = self
            .client
            .get(self.url(tile))
            .send()
            .await
            .map_err(|err| Error::imagery(tile, err.without_url()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::imagery(tile, format!("HTTP {status}")));
        }
        let bytes = res
            .bytes()
            .await
            .map_err(|err| Error::imagery(tile, err.without_url()))?;
        if bytes.is_empty() {
            return Err(Error::imagery(tile, "empty body"));
        }
        Ok(bytes.to_vec())
    }
}

/// Cuts a parent raster into its four quadrants and pairs each with the child
/// tile at the same position. Children are re-encoded as PNG.
pub fn split_supertile(parent: &Tile, bytes: &[u8]) -> Result<[Raster; 4]> {
    let image = image::load_from_memory(bytes).map_err(|err| Error::imagery(parent, err))?;
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
        return Err(Error::imagery(
            parent,
            format!("supertile of {width}x{height} cannot be split into quadrants"),
        ));
    }

    let mut rasters = Vec::with_capacity(4);
    for quadrant in Quadrant::ALL {
        let tile = quadrant
            .child_of(parent)
            .map_err(|err| Error::imagery(parent, err))?;
        let window = quadrant.window(width, height);
        let child = image.crop_imm(window.col, window.row, window.width, window.height);
        let mut bytes = Vec::new();
        child
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|err| Error::imagery(parent, err))?;
        rasters.push(Raster { tile, bytes });
    }
    rasters
        .try_into()
        .map_err(|_| Error::imagery(parent, "expected four quadrants"))
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgb, RgbImage};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use super::*;

    fn template(url: &str) -> Secret<String> {
        Secret::new(url.to_string())
    }

    /// Each quadrant gets a distinct solid colour so crops can be told apart.
    fn quadrant_colours() -> [Rgb<u8>; 4] {
        [
            Rgb([255, 0, 0]),
            Rgb([0, 255, 0]),
            Rgb([0, 0, 255]),
            Rgb([255, 255, 0]),
        ]
    }

    fn supertile_png(size: u32) -> Vec<u8> {
        let colours = quadrant_colours();
        let half = size / 2;
        let img = RgbImage::from_fn(size, size, |col, row| {
            let idx = (row / half) * 2 + (col / half);
            colours[idx as usize]
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_split_assigns_children_by_position() {
        let parent = Tile::new(4, 5, 3).unwrap();
        let rasters = split_supertile(&parent, &supertile_png(512)).unwrap();
        let colours = quadrant_colours();
        let expected = [(8, 10), (9, 10), (8, 11), (9, 11)];
        for (i, raster) in rasters.iter().enumerate() {
            assert_eq!((raster.tile.x(), raster.tile.y()), expected[i]);
            assert_eq!(raster.tile.z(), 4);
            let child = image::load_from_memory(&raster.bytes).unwrap().to_rgb8();
            assert_eq!(child.dimensions(), (256, 256));
            assert!(child.pixels().all(|p| *p == colours[i]));
        }
    }

    #[test]
    fn test_split_rejects_garbage() {
        let parent = Tile::new(4, 5, 3).unwrap();
        assert!(matches!(
            split_supertile(&parent, b"not an image"),
            Err(Error::ImageryFetch { .. })
        ));
    }

    #[test]
    fn test_url_template() {
        let fetcher = ImageryFetcher::new(
            reqwest::Client::new(),
            template("https://tiles.example.com/{z}/{x}/{y}.png?token=abc"),
        );
        let tile = Tile::new(4, 5, 3).unwrap();
        assert_eq!(
            fetcher.url(&tile),
            "https://tiles.example.com/3/4/5.png?token=abc"
        );
    }

    #[tokio::test]
    async fn fetch_tiles_in_order() {
        let server = MockServer::start().await;
        for x in 0..4u32 {
            Mock::given(method("GET"))
                .and(path(format!("/3/{x}/5.png")))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![x as u8; 8]))
                .mount(&server)
                .await;
        }
        let fetcher = ImageryFetcher::new(
            reqwest::Client::new(),
            template(&format!("{}/{{z}}/{{x}}/{{y}}.png", server.uri())),
        )
        .with_concurrency(3);
        let tiles: Vec<_> = [3, 1, 0, 2]
            .into_iter()
            .map(|x| Tile::new(x, 5, 3).unwrap())
            .collect();
        let rasters = fetcher.fetch(ImageryMode::Tile, &tiles).await.unwrap();
        for (tile, raster) in tiles.iter().zip(&rasters) {
            assert_eq!(raster.tile, *tile);
            assert_eq!(raster.bytes, vec![tile.x() as u8; 8]);
        }
    }

    #[tokio::test]
    async fn fetch_fails_on_http_error_and_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/4/5.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/3/5/5.png"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let fetcher = ImageryFetcher::new(
            reqwest::Client::new(),
            template(&format!("{}/{{z}}/{{x}}/{{y}}.png", server.uri())),
        );
        for x in [4, 5] {
            let tiles = [Tile::new(x, 5, 3).unwrap()];
            assert!(matches!(
                fetcher.fetch(ImageryMode::Tile, &tiles).await,
                Err(Error::ImageryFetch { .. })
            ));
        }
    }

    #[tokio::test]
    async fn fetch_supertiles_flattens_children() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/4/5.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(supertile_png(512)))
            .mount(&server)
            .await;
        let fetcher = ImageryFetcher::new(
            reqwest::Client::new(),
            template(&format!("{}/{{z}}/{{x}}/{{y}}.png", server.uri())),
        );
        let parent = Tile::new(4, 5, 3).unwrap();
        let rasters = fetcher
            .fetch(ImageryMode::Supertile, &[parent])
            .await
            .unwrap();
        let tiles: Vec<_> = rasters.iter().map(|r| r.tile).collect();
        assert_eq!(tiles, parent.children().unwrap().to_vec());
    }
}
