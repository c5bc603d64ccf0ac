pub mod filesystem;
pub mod price;

pub use filesystem::{AppendHandle, Filesystem, ReadFs, WriteFs};
pub use price::{
    PriceLogRetriever, PriceModel, PriceReader, PriceSetter, PriceSetterAtomic, PriceState, PriceUpdater, RecordWriter,
};
