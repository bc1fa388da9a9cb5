/*!

# Brainscan Core

This crate contains the pieces shared by every brainscan front: the
static model descriptors, image decoding and tensor preprocessing, the
label vocabulary, and the narrow boundary to the numeric engine that
actually executes models.

The engine is deliberately opaque. Anything implementing
[`session::Engine`] can turn a model file into a [`session::Session`],
and a session can be run with named input tensors to produce named
output tensors. Decoding and preprocessing are pure functions of their
inputs.

```no_run
use brainscan_core::prelude::*;
# fn read_upload() -> Vec<u8> { vec![] }

let descriptor = reference_models().remove(0);
descriptor.validate()?;

let image = decode(&read_upload())?;
let tensor = prepare(&descriptor, &image)?;
assert_eq!(tensor.shape(), &descriptor.input_shape[..]);
# Ok::<(), Box<dyn std::error::Error>>(())
```
 */

#![warn(rust_2018_idioms)]

pub mod descriptor;
mod error;
pub mod labels;
pub mod pixels;
pub mod preprocess;
pub mod session;
pub mod tensor;

#[doc(inline)]
pub use crate::error::ScanError;

/// Most core utilities are re-exported here.
pub mod prelude {
    pub use super::descriptor::{
        check_unique_ids, load_manifest, reference_models, ChannelMode, ModelDescriptor,
        TargetSize,
    };
    pub use super::error::ScanError;
    pub use super::pixels::{decode, resample, MediaType, PixelBuffer};
    pub use super::labels::{classify, first_argmax, Prediction, TumorClass};
    pub use super::preprocess::{prepare, to_tensor_data};
    pub use super::session::{Engine, Feeds, Outputs, Session, SessionExt};
    pub use super::tensor::Tensor;
}
