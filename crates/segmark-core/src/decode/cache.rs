//! Decoded buffer cache keyed by source name

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;

use super::{DecodeService, DecodedBuffer};
use crate::error::DecodeError;
use crate::interval::FileSpan;

/// Keeps every decoded source so snap and export never decode twice
pub struct BufferCache {
    service: Arc<dyn DecodeService>,
    buffers: HashMap<String, Arc<DecodedBuffer>>,
}

impl BufferCache {
    pub fn new(service: Arc<dyn DecodeService>) -> Self {
        Self {
            service,
            buffers: HashMap::new(),
        }
    }

    /// Decode service used for cache misses
    pub fn service(&self) -> Arc<dyn DecodeService> {
        Arc::clone(&self.service)
    }

    pub fn get(&self, source: &str) -> Option<Arc<DecodedBuffer>> {
        self.buffers.get(source).cloned()
    }

    pub fn insert(&mut self, source: impl Into<String>, buffer: Arc<DecodedBuffer>) {
        self.buffers.insert(source.into(), buffer);
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Cached buffer, decoding and caching it on a miss
    pub fn get_or_decode(&mut self, source: &str) -> Result<Arc<DecodedBuffer>, DecodeError> {
        if let Some(buffer) = self.get(source) {
            return Ok(buffer);
        }
        let buffer = Arc::new(self.service.decode(source)?);
        self.buffers.insert(source.to_string(), Arc::clone(&buffer));
        Ok(buffer)
    }

    /// Buffers for a run of file spans, in the same order
    pub fn buffers_for(&mut self, files: &[FileSpan]) -> Result<Vec<Arc<DecodedBuffer>>, DecodeError> {
        files.iter().map(|f| self.get_or_decode(&f.filename)).collect()
    }

    /// Decode every listed source in parallel, in listing order
    ///
    /// Fails on the first source the service rejects.
    pub fn preload(&mut self, sources: &[String]) -> Result<Vec<Arc<DecodedBuffer>>, DecodeError> {
        let service = Arc::clone(&self.service);
        let decoded: Vec<Result<DecodedBuffer, DecodeError>> = sources
            .par_iter()
            .map(|source| service.decode(source))
            .collect();

        let mut out = Vec::with_capacity(sources.len());
        for (source, result) in sources.iter().zip(decoded) {
            let buffer = Arc::new(result?);
            self.buffers.insert(source.clone(), Arc::clone(&buffer));
            out.push(buffer);
        }
        log::info!("Preloaded {} source(s)", out.len());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDecoder {
        calls: AtomicUsize,
    }

    impl DecodeService for CountingDecoder {
        fn decode(&self, source: &str) -> Result<DecodedBuffer, DecodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if source == "bad" {
                return Err(DecodeError::Malformed(source.to_string()));
            }
            Ok(DecodedBuffer::mono(8000, vec![0.0; source.len()]))
        }
    }

    #[test]
    fn test_decodes_once() {
        let decoder = Arc::new(CountingDecoder { calls: AtomicUsize::new(0) });
        let mut cache = BufferCache::new(decoder.clone());
        cache.get_or_decode("abc").unwrap();
        cache.get_or_decode("abc").unwrap();
        assert_eq!(decoder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("abc").unwrap().len(), 3);
    }

    #[test]
    fn test_preload_keeps_order_and_reports_failure() {
        let decoder = Arc::new(CountingDecoder { calls: AtomicUsize::new(0) });
        let mut cache = BufferCache::new(decoder);
        let names: Vec<String> = vec!["a".into(), "bbbb".into(), "cc".into()];
        let buffers = cache.preload(&names).unwrap();
        assert_eq!(buffers.iter().map(|b| b.len()).collect::<Vec<_>>(), vec![1, 4, 2]);

        let bad: Vec<String> = vec!["a".into(), "bad".into()];
        assert!(cache.preload(&bad).is_err());
    }
}
