//! Invariant checks excluded from coverage reports.

#![cfg_attr(coverage_nightly, coverage(off))]

use crate::{DescriptorPool, EnumDescriptor, EnumId, MessageDescriptor, MessageId};

impl DescriptorPool {
    pub(crate) fn ensure_message(&self, id: MessageId) -> &MessageDescriptor {
        self.get_message(id).unwrap_or_else(|| {
            panic!(
                "DescriptorPool: message id {} out of range ({} messages)",
                id.0,
                self.message_count()
            )
        })
    }

    pub(crate) fn ensure_enum(&self, id: EnumId) -> &EnumDescriptor {
        self.enums().get(id.index()).unwrap_or_else(|| {
            panic!(
                "DescriptorPool: enum id {} out of range ({} enums)",
                id.0,
                self.enums().len()
            )
        })
    }
}
