//! Memory type selection.
//!
//! Host-visible buffers pick their memory type by scanning the physical
//! device's memory types in index order and taking the first one that is
//! both allowed by the resource's requirement bits and carries the
//! requested property flags. The scan is deterministic: for identical
//! inputs it always lands on the lowest matching index.

use ash::vk;

/// Returns the index of the first memory type compatible with
/// `type_bits` (from `VkMemoryRequirements::memoryTypeBits`) that has all
/// of the `required` property flags, or `None` when nothing matches.
///
/// Heap sizes and budgets are deliberately ignored; allocation failure is
/// reported by `vkAllocateMemory` itself.
pub fn select_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Option<u32> {
    props.memory_types[..props.memory_type_count as usize]
        .iter()
        .enumerate()
        .find(|(index, memory_type)| {
            type_bits & (1u32 << index) != 0 && memory_type.property_flags.contains(required)
        })
        .map(|(index, _)| index as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (i, &property_flags) in flags.iter().enumerate() {
            props.memory_types[i] = vk::MemoryType {
                property_flags,
                heap_index: 0,
            };
        }
        props
    }

    const HOST: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::HOST_VISIBLE;
    const DEVICE: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::DEVICE_LOCAL;

    #[test]
    fn test_first_match_wins() {
        // Indices 1 and 2 both qualify; the scan must stop at 1.
        let props = props(&[DEVICE, HOST, HOST]);
        assert_eq!(select_memory_type(&props, 0b111, HOST), Some(1));
    }

    #[test]
    fn test_requirement_bits_filter() {
        // Index 0 has the right flags but its requirement bit is clear.
        let props = props(&[HOST, HOST]);
        assert_eq!(select_memory_type(&props, 0b10, HOST), Some(1));
    }

    #[test]
    fn test_no_match_is_none_not_zero() {
        let props = props(&[DEVICE, DEVICE]);
        assert_eq!(select_memory_type(&props, 0b11, HOST), None);
    }

    #[test]
    fn test_zero_requirement_bits() {
        let props = props(&[HOST]);
        assert_eq!(select_memory_type(&props, 0, HOST), None);
    }

    #[test]
    fn test_all_required_flags_must_be_present() {
        let coherent = HOST | vk::MemoryPropertyFlags::HOST_COHERENT;
        // Index 0 is only HOST_VISIBLE; index 1 has both requested flags.
        let props = props(&[HOST, coherent]);
        assert_eq!(select_memory_type(&props, 0b11, coherent), Some(1));
    }

    #[test]
    fn test_empty_required_flags_take_first_allowed() {
        let props = props(&[DEVICE, HOST]);
        assert_eq!(
            select_memory_type(&props, 0b10, vk::MemoryPropertyFlags::empty()),
            Some(1)
        );
    }

    #[test]
    fn test_types_beyond_count_are_ignored() {
        // Entry 1 exists in the array but memory_type_count hides it.
        let mut props = props(&[DEVICE, HOST]);
        props.memory_type_count = 1;
        assert_eq!(select_memory_type(&props, 0b11, HOST), None);
    }

    #[test]
    fn test_deterministic() {
        let props = props(&[DEVICE, HOST, HOST, DEVICE]);
        let first = select_memory_type(&props, 0b1111, HOST);
        for _ in 0..16 {
            assert_eq!(select_memory_type(&props, 0b1111, HOST), first);
        }
    }
}
