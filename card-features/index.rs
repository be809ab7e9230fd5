use card_core::Descriptor;
use rayon::prelude::*;

use crate::descriptor::squared_distance;

/// One query descriptor paired with its nearest training descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DescriptorMatch {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

/// Exhaustive L2 nearest-neighbour index over a borrowed descriptor set
#[derive(Debug, Clone, Copy)]
pub struct DescriptorIndex<'a> {
    train: &'a [Descriptor],
}

impl<'a> DescriptorIndex<'a> {
    pub fn build(train: &'a [Descriptor]) -> Self {
        Self { train }
    }

    pub fn len(&self) -> usize {
        self.train.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train.is_empty()
    }

    /// Nearest training descriptor as `(index, distance)`; the lowest index
    /// wins on equal distance
    pub fn nearest(&self, query: &Descriptor) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, train) in self.train.iter().enumerate() {
            let d = squared_distance(query, train);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, d)| (i, d.sqrt()))
    }

    /// Best match for every query, in query order
    pub fn query_all(&self, queries: &[Descriptor]) -> Vec<DescriptorMatch> {
        queries
            .par_iter()
            .enumerate()
            .filter_map(|(query_idx, q)| {
                self.nearest(q).map(|(train_idx, distance)| DescriptorMatch {
                    query_idx,
                    train_idx,
                    distance,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use card_core::DESCRIPTOR_LEN;

    fn unit(axis: usize) -> Descriptor {
        let mut d = [0.0; DESCRIPTOR_LEN];
        d[axis] = 1.0;
        d
    }

    #[test]
    fn test_nearest_picks_closest() {
        let train = vec![unit(0), unit(1), unit(2)];
        let index = DescriptorIndex::build(&train);
        let (idx, dist) = index.nearest(&unit(1)).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(dist, 0.0);
    }

    #[test]
    fn test_ties_resolve_to_lowest_index() {
        let train = vec![unit(3), unit(0), unit(0)];
        let index = DescriptorIndex::build(&train);
        assert_eq!(index.nearest(&unit(0)).unwrap().0, 1);
        // Equidistant from every training vector
        assert_eq!(index.nearest(&unit(7)).unwrap().0, 0);
    }

    #[test]
    fn test_query_all_keeps_query_order() {
        let train = vec![unit(0), unit(1)];
        let queries = vec![unit(1), unit(0), unit(5)];
        let matches = DescriptorIndex::build(&train).query_all(&queries);

        assert_eq!(matches.len(), 3);
        assert_eq!(matches.iter().map(|m| m.query_idx).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(matches[0].train_idx, 1);
        assert_eq!(matches[1].train_idx, 0);
        assert!((matches[2].distance - 2f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_empty_index() {
        let index = DescriptorIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.nearest(&unit(0)).is_none());
        assert!(index.query_all(&[unit(0)]).is_empty());
    }
}
