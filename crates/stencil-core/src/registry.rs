/*
 * registry.rs
 * Copyright (c) 2026 Stencil Contributors
 *
 * Swap-under-lock compiler backend selection.
 */

//! Compiler backend registry.
//!
//! The registry is the single point of truth for "which backend handles
//! language L". It is an explicit object owned by the service that owns
//! the pipeline, not process-global state, but it keeps the classic
//! swap-under-lock semantics: the active factory can be replaced at
//! runtime, all reads and the one write are serialized through a single
//! mutex, and the lock is held only while the strategy reference is
//! swapped or cloned, never across service creation or compilation. An
//! in-flight compile holding the previous factory is unaffected by a
//! swap.

use std::sync::{Arc, Mutex};

use crate::compiler::{CompilerService, CompilerServiceFactory, Language};
use crate::error::Result;

/// Registry mapping a [`Language`] to its [`CompilerServiceFactory`].
pub struct CompilerRegistry {
    factory: Mutex<Arc<dyn CompilerServiceFactory>>,
    default_language: Language,
}

impl CompilerRegistry {
    /// Create a registry with the given factory and the canonical default
    /// language.
    pub fn new(factory: Arc<dyn CompilerServiceFactory>) -> Self {
        CompilerRegistry {
            factory: Mutex::new(factory),
            default_language: Language::default(),
        }
    }

    /// Create a registry whose default service uses `language`.
    pub fn with_default_language(
        factory: Arc<dyn CompilerServiceFactory>,
        language: Language,
    ) -> Self {
        CompilerRegistry {
            factory: Mutex::new(factory),
            default_language: language,
        }
    }

    /// Replace the factory strategy.
    ///
    /// Every `get_service` call that starts after this returns observes
    /// the new factory. (Non-null is enforced by the type: there is no
    /// way to hand in an absent factory.)
    pub fn set_factory(&self, factory: Arc<dyn CompilerServiceFactory>) {
        let mut slot = self.factory.lock().expect("registry lock poisoned");
        *slot = factory;
    }

    /// Create a compiler service for the language.
    ///
    /// The factory reference is cloned under the lock; the service is
    /// created outside the critical section so a slow backend cannot
    /// stall unrelated lookups. Unsupported languages fail naming the
    /// language and leave the active strategy unchanged.
    pub fn get_service(&self, language: Language) -> Result<Box<dyn CompilerService>> {
        let factory = {
            let slot = self.factory.lock().expect("registry lock poisoned");
            Arc::clone(&slot)
        };
        tracing::debug!(%language, "creating compiler service");
        factory.create_compiler_service(language)
    }

    /// Create a compiler service for the configured default language.
    pub fn get_default_service(&self) -> Result<Box<dyn CompilerService>> {
        self.get_service(self.default_language)
    }

    /// The language `get_default_service` uses.
    pub fn default_language(&self) -> Language {
        self.default_language
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompilationArtifact, CompileContext};
    use crate::error::StencilError;

    struct StubService {
        label: &'static str,
        debug: bool,
        in_memory: bool,
    }

    impl CompilerService for StubService {
        fn compile_type(&self, _context: &CompileContext) -> Result<CompilationArtifact> {
            unimplemented!("stub backend never compiles")
        }

        fn include_assemblies(&self) -> Vec<String> {
            vec![self.label.to_string()]
        }

        fn debug(&self) -> bool {
            self.debug
        }

        fn set_debug(&mut self, debug: bool) {
            self.debug = debug;
        }

        fn disable_temp_file_locking(&self) -> bool {
            self.in_memory
        }

        fn set_disable_temp_file_locking(&mut self, disable: bool) {
            self.in_memory = disable;
        }
    }

    struct StubFactory {
        label: &'static str,
    }

    impl CompilerServiceFactory for StubFactory {
        fn create_compiler_service(&self, language: Language) -> Result<Box<dyn CompilerService>> {
            match language {
                Language::Stencil => Ok(Box::new(StubService {
                    label: self.label,
                    debug: false,
                    in_memory: false,
                })),
                other => Err(StencilError::UnsupportedLanguage { language: other }),
            }
        }
    }

    #[test]
    fn test_swap_is_visible_to_subsequent_calls() {
        let registry = CompilerRegistry::new(Arc::new(StubFactory { label: "first" }));
        let service = registry.get_service(Language::Stencil).unwrap();
        assert_eq!(service.include_assemblies(), vec!["first".to_string()]);

        registry.set_factory(Arc::new(StubFactory { label: "second" }));
        let service = registry.get_service(Language::Stencil).unwrap();
        assert_eq!(service.include_assemblies(), vec!["second".to_string()]);

        // The previously created service still belongs to the old factory.
        // (It keeps working; nothing is torn out from under it.)
    }

    #[test]
    fn test_unsupported_language_names_language_and_keeps_strategy() {
        let registry = CompilerRegistry::new(Arc::new(StubFactory { label: "only" }));

        let err = registry.get_service(Language::Script).unwrap_err();
        assert!(err.to_string().contains("script"));
        match err {
            StencilError::UnsupportedLanguage { language } => {
                assert_eq!(language, Language::Script);
            }
            other => panic!("expected UnsupportedLanguage, got {other:?}"),
        }

        // The failed request did not disturb the active strategy.
        let service = registry.get_service(Language::Stencil).unwrap();
        assert_eq!(service.include_assemblies(), vec!["only".to_string()]);
    }

    #[test]
    fn test_default_service_falls_back_to_canonical_language() {
        let registry = CompilerRegistry::new(Arc::new(StubFactory { label: "default" }));
        assert_eq!(registry.default_language(), Language::Stencil);
        assert!(registry.get_default_service().is_ok());
    }
}
