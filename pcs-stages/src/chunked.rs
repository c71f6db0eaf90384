use pcs_core::pointcloud::{GenericValue, PointCursor, PtColor, PtGeometry};

use crate::error::SetupError;
use crate::passthrough::{take_chain, PassThrough};

/// One loaded batch of points in contiguous storage.
///
/// Colors are kept only while every point in the batch carries one; the
/// first colorless point abandons color capture for the whole batch, so
/// consumers never see a mixed-presence batch.
#[derive(Debug, Default)]
pub struct Chunk {
    pub geometry: Vec<PtGeometry<f64>>,
    pub colors: Option<Vec<PtColor<f64>>>,
    pub attributes: Vec<Vec<(String, GenericValue)>>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    fn clear(&mut self) {
        self.geometry.clear();
        self.colors = Some(Vec::new());
        self.attributes.clear();
    }
}

/// Accumulates a bounded batch of upstream points to amortize per-point
/// overhead for batch-friendly consumers.
///
/// Points are exposed from the current batch by index; running past the
/// batch end triggers a reload, which reports exhaustion once the upstream
/// has nothing left. A post-load hook runs on each freshly loaded batch
/// before consumers see it, e.g. for vectorized transforms.
pub struct ChunkedCursor {
    base: PassThrough,
    chunk_size: usize,
    chunk: Chunk,
    index: usize,
    upstream_exhausted: bool,
    post_load: Option<Box<dyn FnMut(&mut Chunk)>>,
}

impl ChunkedCursor {
    pub fn attach(chain: &mut Box<dyn PointCursor>, chunk_size: usize) -> Result<(), SetupError> {
        Self::attach_with_hook(chain, chunk_size, None)
    }

    /// Attach with a hook that post-processes every loaded batch.
    pub fn attach_with_hook(
        chain: &mut Box<dyn PointCursor>,
        chunk_size: usize,
        post_load: Option<Box<dyn FnMut(&mut Chunk)>>,
    ) -> Result<(), SetupError> {
        if chunk_size == 0 {
            return Err(SetupError::ZeroChunkSize);
        }

        let mut stage = ChunkedCursor {
            base: PassThrough::new(take_chain(chain)),
            chunk_size,
            chunk: Chunk::default(),
            index: 0,
            upstream_exhausted: false,
            post_load,
        };
        stage.load();

        *chain = Box::new(stage);
        Ok(())
    }

    fn load(&mut self) -> bool {
        self.chunk.clear();
        self.index = 0;

        if self.upstream_exhausted || !self.base.has_data() {
            self.upstream_exhausted = true;
            return false;
        }

        for _ in 0..self.chunk_size {
            self.chunk.geometry.push(self.base.position());

            if self.chunk.colors.is_some() {
                match self.base.color() {
                    Some(color) => {
                        if let Some(colors) = &mut self.chunk.colors {
                            colors.push(color);
                        }
                    }
                    None => self.chunk.colors = None,
                }
            }

            let names = self.base.attribute_list();
            let mut attributes = Vec::with_capacity(names.len());
            for (id, name) in names.into_iter().enumerate() {
                if let Some(value) = self.base.attribute_by_id(id) {
                    attributes.push((name, value));
                }
            }
            self.chunk.attributes.push(attributes);

            if !self.base.advance() {
                self.upstream_exhausted = true;
                break;
            }
        }

        if let Some(hook) = &mut self.post_load {
            hook(&mut self.chunk);
        }

        !self.chunk.is_empty()
    }

    fn current_attributes(&self) -> Option<&Vec<(String, GenericValue)>> {
        self.chunk.attributes.get(self.index)
    }
}

impl PointCursor for ChunkedCursor {
    fn position(&self) -> PtGeometry<f64> {
        self.chunk
            .geometry
            .get(self.index)
            .copied()
            .unwrap_or_default()
    }

    fn color(&self) -> Option<PtColor<f64>> {
        self.chunk
            .colors
            .as_ref()
            .and_then(|colors| colors.get(self.index))
            .copied()
    }

    fn attribute_by_id(&self, id: usize) -> Option<GenericValue> {
        self.current_attributes()
            .and_then(|attrs| attrs.get(id))
            .map(|(_, v)| v.clone())
    }

    fn attribute_by_name(&self, name: &str) -> Option<GenericValue> {
        self.current_attributes().and_then(|attrs| {
            attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
        })
    }

    fn attribute_list(&self) -> Vec<String> {
        self.current_attributes()
            .map(|attrs| attrs.iter().map(|(n, _)| n.clone()).collect())
            .unwrap_or_default()
    }

    fn advance(&mut self) -> bool {
        if self.index + 1 < self.chunk.len() {
            self.index += 1;
            return true;
        }
        self.load()
    }

    fn has_data(&self) -> bool {
        self.index < self.chunk.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcs_core::pointcloud::{BufferCloud, BufferPoint};

    fn cloud_of(n: usize) -> BufferCloud {
        BufferCloud::new(
            (0..n)
                .map(|i| {
                    BufferPoint::new(i as f64, 0.0, 0.0)
                        .with_color(0.5, 0.5, 0.5, 1.0)
                        .with_attribute("idx", i as u64)
                })
                .collect(),
        )
    }

    fn collect_xs(chain: &mut Box<dyn PointCursor>) -> Vec<f64> {
        let mut xs = Vec::new();
        if chain.has_data() {
            xs.push(chain.position().x);
            while chain.advance() {
                xs.push(chain.position().x);
            }
        }
        xs
    }

    #[test]
    fn batches_are_transparent_to_the_consumer() {
        let mut chain: Box<dyn PointCursor> = Box::new(cloud_of(7).cursor());
        ChunkedCursor::attach(&mut chain, 3).unwrap();
        assert_eq!(
            collect_xs(&mut chain),
            (0..7).map(|i| i as f64).collect::<Vec<_>>()
        );
    }

    #[test]
    fn attributes_and_color_survive_buffering() {
        let mut chain: Box<dyn PointCursor> = Box::new(cloud_of(4).cursor());
        ChunkedCursor::attach(&mut chain, 2).unwrap();
        assert!(chain.advance());
        assert!(chain.advance());
        assert_eq!(chain.attribute_by_name("idx"), Some(GenericValue::UInt(2)));
        assert_eq!(chain.attribute_list(), vec!["idx".to_string()]);
        assert!(chain.color().is_some());
    }

    #[test]
    fn mixed_color_presence_abandons_the_batch_colors() {
        let cloud = BufferCloud::new(vec![
            BufferPoint::new(0.0, 0.0, 0.0).with_color(1.0, 0.0, 0.0, 1.0),
            BufferPoint::new(1.0, 0.0, 0.0),
        ]);
        let mut chain: Box<dyn PointCursor> = Box::new(cloud.cursor());
        ChunkedCursor::attach(&mut chain, 4).unwrap();
        assert!(chain.color().is_none());
    }

    #[test]
    fn post_load_hook_sees_every_batch() {
        let mut chain: Box<dyn PointCursor> = Box::new(cloud_of(5).cursor());
        ChunkedCursor::attach_with_hook(
            &mut chain,
            2,
            Some(Box::new(|chunk: &mut Chunk| {
                for g in &mut chunk.geometry {
                    g.z += 100.0;
                }
            })),
        )
        .unwrap();

        let mut zs = vec![chain.position().z];
        while chain.advance() {
            zs.push(chain.position().z);
        }
        assert_eq!(zs, vec![100.0; 5]);
    }

    #[test]
    fn empty_source_loads_an_empty_batch() {
        let mut chain: Box<dyn PointCursor> = Box::new(BufferCloud::default().cursor());
        ChunkedCursor::attach(&mut chain, 8).unwrap();
        assert!(!chain.has_data());
        assert!(!chain.advance());
    }

    #[test]
    fn zero_chunk_size_fails_setup() {
        let mut chain: Box<dyn PointCursor> = Box::new(cloud_of(2).cursor());
        let err = ChunkedCursor::attach(&mut chain, 0);
        assert!(matches!(err, Err(SetupError::ZeroChunkSize)));
        assert!(chain.has_data());
    }
}
