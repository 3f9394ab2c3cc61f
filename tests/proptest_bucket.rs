//! Property-based tests for frame-count bucket assignment.

use clip_prep::{assign_bucket, Assignment, BucketSet, FrameCount, Unbucketed};
use proptest::collection::btree_set;
use proptest::prelude::*;

fn bucket_set() -> impl Strategy<Value = BucketSet> {
    btree_set(1u64..10_000, 1..10)
        .prop_map(|set| BucketSet::new(set.into_iter().rev().collect()).unwrap())
}

proptest! {
    /// The chosen bucket is the largest threshold not above the frame count.
    #[test]
    fn picks_largest_threshold_not_above_count(buckets in bucket_set(), frames in 0u64..20_000) {
        let expected = buckets.thresholds().iter().copied().filter(|&t| t <= frames).max();
        match assign_bucket(FrameCount::Known(frames), &buckets) {
            Assignment::Bucket(bucket) => prop_assert_eq!(Some(bucket), expected),
            Assignment::Unbucketed(reason) => {
                prop_assert_eq!(reason, Unbucketed::BelowMinimum);
                prop_assert_eq!(expected, None);
            }
        }
    }

    /// More frames never move a clip to a smaller bucket.
    #[test]
    fn assignment_is_monotonic(buckets in bucket_set(), a in 0u64..20_000, b in 0u64..20_000) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let first = assign_bucket(FrameCount::Known(low), &buckets);
        let second = assign_bucket(FrameCount::Known(high), &buckets);
        prop_assert!(first <= second, "{:?} then {:?}", first, second);
    }

    /// Thresholds come back sorted no matter the input order.
    #[test]
    fn thresholds_are_sorted(buckets in bucket_set()) {
        prop_assert!(buckets.thresholds().windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn unknown_counts_are_never_bucketed() {
    let buckets = BucketSet::new(vec![1, 30]).unwrap();
    assert_eq!(
        assign_bucket(FrameCount::Unknown, &buckets),
        Assignment::Unbucketed(Unbucketed::UnknownFrameCount)
    );
}
