use crate::{TransportProvider, transport::DynTransport};

pub struct TransportBuilder {
    providers: Vec<Box<dyn TransportProvider>>,
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn register_provider<P: TransportProvider + 'static>(&mut self, provider: P) {
        self.providers.push(Box::new(provider));
    }

    pub fn with_provider<P: TransportProvider + 'static>(mut self, provider: P) -> Self {
        self.register_provider(provider);
        self
    }

    pub fn build(&self, uri: &str) -> Result<DynTransport, anyhow::Error> {
        let url = url::Url::parse(uri).map_err(|e| anyhow::anyhow!("Invalid URL '{}': {}", uri, e))?;

        for provider in &self.providers {
            if provider.schemes().contains(&url.scheme()) {
                return provider.build(&url);
            }
        }
        Err(anyhow::anyhow!(
            "No suitable transport provider found for URI: {}",
            url
        ))
    }
}
