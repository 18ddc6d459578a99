// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Component and Bundle traits.
//!
//! Components are plain data attached to entities. Bundles group multiple
//! components together for a single spawn call.

use smallvec::{smallvec, SmallVec};

use crate::error::Result;
use crate::registry::{ComponentId, TypeRegistry};

/// Maximum number of components supported by a single `Bundle` impl.
pub const MAX_BUNDLE_COMPONENTS: usize = 8;

/// Marker trait for components. Components must be `'static` plain data --
/// no borrowed fields, no destructors that assume archetype-internal state.
pub trait Component: 'static + Send + Sync {}

impl<T: 'static + Send + Sync> Component for T {}

/// A fixed set of components spawned onto one entity at once.
pub trait Bundle: Send + Sync + 'static {
    /// Resolve (registering if necessary) the `ComponentId` of every member,
    /// in declaration order.
    fn component_ids(registry: &TypeRegistry) -> Result<SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]>>
    where
        Self: Sized;

    /// Write every member to its destination pointer. `ptrs` is ordered the
    /// same as `component_ids`.
    ///
    /// # Safety
    /// Caller must ensure each pointer is valid, uniquely-owned for the
    /// write, and aligned for the corresponding component type.
    unsafe fn write_components(self, ptrs: &[*mut u8]);
}

macro_rules! impl_bundle {
    ($($T:ident),*) => {
        impl<$($T: Component),*> Bundle for ($($T,)*) {
            fn component_ids(registry: &TypeRegistry) -> Result<SmallVec<[ComponentId; MAX_BUNDLE_COMPONENTS]>> {
                Ok(smallvec![$(registry.register::<$T>()?),*])
            }

            #[allow(non_snake_case)]
            unsafe fn write_components(self, ptrs: &[*mut u8]) {
                let ($($T,)*) = self;
                let mut i = 0;
                $(
                    std::ptr::write(ptrs[i] as *mut $T, $T);
                    i += 1;
                )*
                let _ = i;
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);
