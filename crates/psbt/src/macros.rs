macro_rules! psbt_map {
    ($(#[$outer:meta])* $name:ident) => {
        $(#[$outer])*
        #[derive(PartialEq, Eq, Clone, Default, Debug, Ord, PartialOrd)]
        pub struct $name {
            map: std::collections::BTreeMap<$crate::common::PsbtKey, $crate::common::PsbtValue>,
        }

        impl $crate::common::PstMap for $name {
            fn get(&self, key: &$crate::common::PsbtKey) -> Option<&$crate::common::PsbtValue> {
                self.map.get(key)
            }

            fn contains_key(&self, key: &$crate::common::PsbtKey) -> bool {
                self.map.contains_key(key)
            }

            fn remove(&mut self, key: &$crate::common::PsbtKey) -> Option<$crate::common::PsbtValue> {
                self.map.remove(key)
            }

            fn keys(
                &self,
            ) -> std::collections::btree_map::Keys<'_, $crate::common::PsbtKey, $crate::common::PsbtValue>
            {
                self.map.keys()
            }

            fn range<R>(
                &self,
                range: R,
            ) -> std::collections::btree_map::Range<'_, $crate::common::PsbtKey, $crate::common::PsbtValue>
            where
                R: std::ops::RangeBounds<$crate::common::PsbtKey>,
            {
                self.map.range(range)
            }

            fn get_mut(
                &mut self,
                key: &$crate::common::PsbtKey,
            ) -> Option<&mut $crate::common::PsbtValue> {
                self.map.get_mut(key)
            }

            fn iter(
                &self,
            ) -> std::collections::btree_map::Iter<'_, $crate::common::PsbtKey, $crate::common::PsbtValue>
            {
                self.map.iter()
            }

            fn iter_mut(
                &mut self,
            ) -> std::collections::btree_map::IterMut<'_, $crate::common::PsbtKey, $crate::common::PsbtValue>
            {
                self.map.iter_mut()
            }

            fn insert(
                &mut self,
                key: $crate::common::PsbtKey,
                value: $crate::common::PsbtValue,
            ) -> Option<$crate::common::PsbtValue> {
                self.map.insert(key, value)
            }

            fn len(&self) -> usize {
                self.map.len()
            }
        }

        impl utxo_core::ser::ByteFormat for $name {
            type Error = $crate::common::PsbtError;

            fn serialized_length(&self) -> usize {
                let kv_length: usize = self
                    .map
                    .iter()
                    .map(|(k, v)| {
                        utxo_core::ser::ByteFormat::serialized_length(k)
                            + utxo_core::ser::ByteFormat::serialized_length(v)
                    })
                    .sum();
                kv_length + 1 // terminates in a 0 byte (null key)
            }

            fn read_from<R>(reader: &mut R, _limit: usize) -> Result<Self, $crate::common::PsbtError>
            where
                R: std::io::Read,
                Self: std::marker::Sized,
            {
                let mut map: std::collections::BTreeMap<$crate::common::PsbtKey, $crate::common::PsbtValue> =
                    Default::default();

                loop {
                    let key: $crate::common::PsbtKey = utxo_core::ser::ByteFormat::read_from(reader, 0)?;
                    if key.is_empty() {
                        break;
                    }
                    if map.contains_key(&key) {
                        return Err($crate::common::PsbtError::DuplicateKey(key));
                    }
                    let value: $crate::common::PsbtValue =
                        utxo_core::ser::ByteFormat::read_from(reader, 0)?;
                    map.insert(key, value);
                }
                Ok(Self { map })
            }

            fn write_to<W>(&self, writer: &mut W) -> Result<usize, $crate::common::PsbtError>
            where
                W: std::io::Write,
            {
                let mut length: usize = 0;
                for (k, v) in self.map.iter() {
                    length += utxo_core::ser::ByteFormat::write_to(k, writer)?;
                    length += utxo_core::ser::ByteFormat::write_to(v, writer)?;
                }
                length += utxo_core::ser::ByteFormat::write_to(&0u8, writer)?;
                Ok(length)
            }
        }
    };
}
