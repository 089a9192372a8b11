/**
 * rules.rs
 * Forward-chained RDFS / OWL-RL closure
 *
 * Each round indexes the current set, fires every rule against it and adds
 * what is new. No rule mints nodes, so the loop reaches a fixpoint.
 */

use oxigraph::model::{NamedNodeRef, SubjectRef, TermRef, Triple, TripleRef};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::ontology::vocab::{owl, rdf, rdfs};

/// Rule families applied in every round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// rdfs2
    Domain,
    /// rdfs3
    Range,
    /// rdfs5
    SubPropertyTransitivity,
    /// rdfs7
    SubPropertyInheritance,
    /// rdfs9
    SubClassInheritance,
    /// rdfs11
    SubClassTransitivity,
    EquivalentClass,
    EquivalentProperty,
    InverseOf,
    Symmetric,
    Transitive,
    SameAs,
    HasValue,
    IntersectionOf,
    UnionOf,
}

impl Rule {
    pub const ALL: [Rule; 15] = [
        Rule::Domain,
        Rule::Range,
        Rule::SubPropertyTransitivity,
        Rule::SubPropertyInheritance,
        Rule::SubClassInheritance,
        Rule::SubClassTransitivity,
        Rule::EquivalentClass,
        Rule::EquivalentProperty,
        Rule::InverseOf,
        Rule::Symmetric,
        Rule::Transitive,
        Rule::SameAs,
        Rule::HasValue,
        Rule::IntersectionOf,
        Rule::UnionOf,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureStats {
    pub rounds: usize,
    pub inferred: usize,
}

/// Close `triples` under every rule in [`Rule::ALL`]
pub fn closure(mut triples: HashSet<Triple>) -> (HashSet<Triple>, ClosureStats) {
    let mut stats = ClosureStats::default();
    loop {
        let new = {
            let index = Index::new(&triples);
            let mut out = Inferred::new(&triples);
            for rule in Rule::ALL {
                apply(rule, &index, &mut out);
            }
            out.new
        };
        if new.is_empty() {
            break;
        }
        stats.rounds += 1;
        stats.inferred += new.len();
        debug!(round = stats.rounds, new = new.len(), total = triples.len(), "closure round");
        triples.extend(new);
    }
    (triples, stats)
}

struct Index<'a> {
    by_predicate: HashMap<NamedNodeRef<'a>, Vec<TripleRef<'a>>>,
    objects: HashMap<(SubjectRef<'a>, NamedNodeRef<'a>), Vec<TermRef<'a>>>,
    members: HashMap<TermRef<'a>, Vec<SubjectRef<'a>>>,
}

impl<'a> Index<'a> {
    fn new(triples: &'a HashSet<Triple>) -> Self {
        let mut by_predicate: HashMap<NamedNodeRef<'a>, Vec<TripleRef<'a>>> = HashMap::new();
        let mut objects: HashMap<(SubjectRef<'a>, NamedNodeRef<'a>), Vec<TermRef<'a>>> = HashMap::new();
        let mut members: HashMap<TermRef<'a>, Vec<SubjectRef<'a>>> = HashMap::new();
        for triple in triples {
            let t = triple.as_ref();
            by_predicate.entry(t.predicate).or_default().push(t);
            objects.entry((t.subject, t.predicate)).or_default().push(t.object);
            if t.predicate == rdf::TYPE {
                members.entry(t.object).or_default().push(t.subject);
            }
        }
        Self {
            by_predicate,
            objects,
            members,
        }
    }

    fn with_predicate(&self, predicate: NamedNodeRef<'a>) -> &[TripleRef<'a>] {
        self.by_predicate.get(&predicate).map_or(&[], |v| v.as_slice())
    }

    fn objects(&self, subject: SubjectRef<'a>, predicate: NamedNodeRef<'a>) -> &[TermRef<'a>] {
        self.objects.get(&(subject, predicate)).map_or(&[], |v| v.as_slice())
    }

    fn members(&self, class: TermRef<'a>) -> &[SubjectRef<'a>] {
        self.members.get(&class).map_or(&[], |v| v.as_slice())
    }

    fn has_type(&self, subject: SubjectRef<'a>, class: TermRef<'a>) -> bool {
        self.objects(subject, rdf::TYPE).contains(&class)
    }

    /// Items of an RDF collection; cycles and malformed cells end the walk
    fn list(&self, head: TermRef<'a>) -> Vec<TermRef<'a>> {
        let mut items = Vec::new();
        let mut visited = HashSet::new();
        let mut cell = head;
        while let Some(node) = as_subject(cell) {
            if cell == TermRef::from(rdf::NIL) || !visited.insert(node) {
                break;
            }
            match self.objects(node, rdf::FIRST).first() {
                Some(item) => items.push(*item),
                None => break,
            }
            match self.objects(node, rdf::REST).first() {
                Some(next) => cell = *next,
                None => break,
            }
        }
        items
    }
}

/// New triples of one round, deduplicated against the closed set
struct Inferred<'a> {
    known: &'a HashSet<Triple>,
    new: HashSet<Triple>,
}

impl<'a> Inferred<'a> {
    fn new(known: &'a HashSet<Triple>) -> Self {
        Self {
            known,
            new: HashSet::new(),
        }
    }

    fn emit(&mut self, subject: SubjectRef<'_>, predicate: NamedNodeRef<'_>, object: TermRef<'_>) {
        let triple = TripleRef::new(subject, predicate, object).into_owned();
        if !self.known.contains(&triple) {
            self.new.insert(triple);
        }
    }

    /// Emit with a term in subject position; literals cannot be subjects
    fn emit_from_term(&mut self, subject: TermRef<'_>, predicate: NamedNodeRef<'_>, object: TermRef<'_>) {
        if let Some(subject) = as_subject(subject) {
            self.emit(subject, predicate, object);
        }
    }
}

fn as_subject(term: TermRef<'_>) -> Option<SubjectRef<'_>> {
    match term {
        TermRef::NamedNode(n) => Some(SubjectRef::NamedNode(n)),
        TermRef::BlankNode(b) => Some(SubjectRef::BlankNode(b)),
        _ => None,
    }
}

fn as_predicate(term: TermRef<'_>) -> Option<NamedNodeRef<'_>> {
    match term {
        TermRef::NamedNode(n) => Some(n),
        _ => None,
    }
}

fn subject_predicate(subject: SubjectRef<'_>) -> Option<NamedNodeRef<'_>> {
    match subject {
        SubjectRef::NamedNode(n) => Some(n),
        _ => None,
    }
}

fn apply<'a>(rule: Rule, index: &Index<'a>, out: &mut Inferred<'_>) {
    match rule {
        Rule::Domain => {
            for axiom in index.with_predicate(rdfs::DOMAIN) {
                let Some(property) = subject_predicate(axiom.subject) else { continue };
                for t in index.with_predicate(property) {
                    out.emit(t.subject, rdf::TYPE, axiom.object);
                }
            }
        }
        Rule::Range => {
            for axiom in index.with_predicate(rdfs::RANGE) {
                let Some(property) = subject_predicate(axiom.subject) else { continue };
                for t in index.with_predicate(property) {
                    out.emit_from_term(t.object, rdf::TYPE, axiom.object);
                }
            }
        }
        Rule::SubPropertyTransitivity => transitive_over(index, rdfs::SUB_PROPERTY_OF, out),
        Rule::SubPropertyInheritance => {
            for axiom in index.with_predicate(rdfs::SUB_PROPERTY_OF) {
                let (Some(sub), Some(sup)) = (subject_predicate(axiom.subject), as_predicate(axiom.object)) else {
                    continue;
                };
                if sub == sup {
                    continue;
                }
                for t in index.with_predicate(sub) {
                    out.emit(t.subject, sup, t.object);
                }
            }
        }
        Rule::SubClassInheritance => {
            for axiom in index.with_predicate(rdfs::SUB_CLASS_OF) {
                for member in index.members(axiom.subject.into()) {
                    out.emit(*member, rdf::TYPE, axiom.object);
                }
            }
        }
        Rule::SubClassTransitivity => transitive_over(index, rdfs::SUB_CLASS_OF, out),
        Rule::EquivalentClass => {
            for axiom in index.with_predicate(owl::EQUIVALENT_CLASS) {
                out.emit(axiom.subject, rdfs::SUB_CLASS_OF, axiom.object);
                out.emit_from_term(axiom.object, rdfs::SUB_CLASS_OF, axiom.subject.into());
            }
        }
        Rule::EquivalentProperty => {
            for axiom in index.with_predicate(owl::EQUIVALENT_PROPERTY) {
                out.emit(axiom.subject, rdfs::SUB_PROPERTY_OF, axiom.object);
                out.emit_from_term(axiom.object, rdfs::SUB_PROPERTY_OF, axiom.subject.into());
            }
        }
        Rule::InverseOf => {
            for axiom in index.with_predicate(owl::INVERSE_OF) {
                let (Some(p), Some(q)) = (subject_predicate(axiom.subject), as_predicate(axiom.object)) else {
                    continue;
                };
                for t in index.with_predicate(p) {
                    out.emit_from_term(t.object, q, t.subject.into());
                }
                for t in index.with_predicate(q) {
                    out.emit_from_term(t.object, p, t.subject.into());
                }
            }
        }
        Rule::Symmetric => {
            for property in index.members(owl::SYMMETRIC_PROPERTY.into()) {
                let Some(p) = subject_predicate(*property) else { continue };
                for t in index.with_predicate(p) {
                    out.emit_from_term(t.object, p, t.subject.into());
                }
            }
        }
        Rule::Transitive => {
            for property in index.members(owl::TRANSITIVE_PROPERTY.into()) {
                let Some(p) = subject_predicate(*property) else { continue };
                transitive_over(index, p, out);
            }
        }
        Rule::SameAs => {
            for t in index.with_predicate(owl::SAME_AS) {
                out.emit_from_term(t.object, owl::SAME_AS, t.subject.into());
            }
            transitive_over(index, owl::SAME_AS, out);
        }
        Rule::HasValue => {
            for axiom in index.with_predicate(owl::HAS_VALUE) {
                let restriction = axiom.subject;
                let value = axiom.object;
                for property in index.objects(restriction, owl::ON_PROPERTY) {
                    let Some(p) = as_predicate(*property) else { continue };
                    // cls-hv1
                    for member in index.members(restriction.into()) {
                        out.emit(*member, p, value);
                    }
                    // cls-hv2
                    for t in index.with_predicate(p) {
                        if t.object == value {
                            out.emit(t.subject, rdf::TYPE, restriction.into());
                        }
                    }
                }
            }
        }
        Rule::IntersectionOf => {
            for axiom in index.with_predicate(owl::INTERSECTION_OF) {
                let class: TermRef<'_> = axiom.subject.into();
                let parts = index.list(axiom.object);
                if parts.is_empty() {
                    continue;
                }
                // cls-int2
                for member in index.members(class) {
                    for part in &parts {
                        out.emit(*member, rdf::TYPE, *part);
                    }
                }
                // cls-int1
                for candidate in index.members(parts[0]) {
                    if parts[1..].iter().all(|part| index.has_type(*candidate, *part)) {
                        out.emit(*candidate, rdf::TYPE, class);
                    }
                }
            }
        }
        Rule::UnionOf => {
            for axiom in index.with_predicate(owl::UNION_OF) {
                let class: TermRef<'_> = axiom.subject.into();
                for part in index.list(axiom.object) {
                    for member in index.members(part) {
                        out.emit(*member, rdf::TYPE, class);
                    }
                }
            }
        }
    }
}

/// (x p y), (y p z) => (x p z)
fn transitive_over<'a>(index: &Index<'a>, predicate: NamedNodeRef<'a>, out: &mut Inferred<'_>) {
    for t in index.with_predicate(predicate) {
        let Some(middle) = as_subject(t.object) else { continue };
        for z in index.objects(middle, t.predicate) {
            out.emit(t.subject, t.predicate, *z);
        }
    }
}
