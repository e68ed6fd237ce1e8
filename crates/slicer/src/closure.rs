use crate::types::{DependencyClosure, DependencyEntry};
use cslice_syntax::{CallExtractor, ExclusionList, FunctionRecord, TranslationUnit};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

/// Where the resolver looks up definitions and their direct calls
pub trait CallSource {
    /// Definition of `name`, if the source has a body for it
    fn definition(&self, name: &str) -> Option<FunctionRecord>;

    /// Names called directly by `function`
    fn calls_of(&self, function: &FunctionRecord) -> BTreeSet<String>;
}

/// Call source backed by a parsed unit; call sets are read from each
/// function's own span on demand
pub struct UnitCallSource<'a> {
    unit: &'a TranslationUnit,
    extractor: &'a CallExtractor,
}

impl<'a> UnitCallSource<'a> {
    pub fn new(unit: &'a TranslationUnit, extractor: &'a CallExtractor) -> Self {
        Self { unit, extractor }
    }
}

impl CallSource for UnitCallSource<'_> {
    fn definition(&self, name: &str) -> Option<FunctionRecord> {
        self.unit.function(name).cloned()
    }

    fn calls_of(&self, function: &FunctionRecord) -> BTreeSet<String> {
        self.extractor.calls_in(self.unit, function)
    }
}

/// Depth-bounded dependency closure over a call source
#[derive(Debug, Clone)]
pub struct ClosureResolver {
    max_depth: usize,
    exclusions: ExclusionList,
}

impl ClosureResolver {
    pub fn new(max_depth: usize, exclusions: ExclusionList) -> Self {
        Self {
            max_depth,
            exclusions,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Collect every function reachable from `root` within `max_depth` calls.
    ///
    /// Each entry carries its shortest depth. The worklist is ordered by
    /// depth; an entry is expanded only at its current best depth and never
    /// twice at the same depth, and the root is pinned at depth 0, so cycles
    /// terminate regardless of the bound.
    pub fn resolve<S>(&self, source: &S, root: &FunctionRecord) -> DependencyClosure
    where
        S: CallSource + ?Sized,
    {
        let mut closure = DependencyClosure::new(root.name.clone());
        if self.max_depth == 0 {
            return closure;
        }

        let mut worklist: BinaryHeap<Reverse<(usize, String)>> = BinaryHeap::new();
        let mut expanded: HashMap<String, usize> = HashMap::new();
        expanded.insert(root.name.clone(), 0);

        self.expand(source, root, 1, &mut closure, &mut worklist);

        while let Some(Reverse((depth, name))) = worklist.pop() {
            // superseded by a shallower path found later
            if closure.depth_of(&name) != Some(depth) {
                continue;
            }
            if expanded.get(&name).is_some_and(|&seen| seen <= depth) {
                continue;
            }
            expanded.insert(name.clone(), depth);

            let Some(function) = closure.get(&name).map(|entry| entry.function.clone()) else {
                continue;
            };
            self.expand(source, &function, depth + 1, &mut closure, &mut worklist);
        }

        log::debug!(
            "Closure of `{}`: {} functions within depth {}",
            closure.root(),
            closure.len(),
            self.max_depth
        );

        closure
    }

    /// Record the callees of `function` at `callee_depth`
    fn expand<S>(
        &self,
        source: &S,
        function: &FunctionRecord,
        callee_depth: usize,
        closure: &mut DependencyClosure,
        worklist: &mut BinaryHeap<Reverse<(usize, String)>>,
    ) where
        S: CallSource + ?Sized,
    {
        if callee_depth > self.max_depth {
            return;
        }

        for callee in source.calls_of(function) {
            if callee == closure.root() || self.exclusions.contains(&callee) {
                continue;
            }

            let Some(definition) = source.definition(&callee) else {
                log::debug!("`{}` calls `{}`, which has no body here", function.name, callee);
                continue;
            };

            let changed = closure.record(DependencyEntry {
                name: callee.clone(),
                depth: callee_depth,
                function: definition,
            });

            if changed && callee_depth < self.max_depth {
                worklist.push(Reverse((callee_depth, callee)));
            }
        }
    }
}
