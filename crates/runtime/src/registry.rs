//! Builtin registration
//!
//! `install` interns every builtin into `clojure.core`, with its Var
//! root holding the native fn value. The host evaluator resolves call
//! targets through the namespace tables; nothing here is reachable
//! until it is interned.
//!
//! Names starting with `__` are expander targets (`delay`, `lazy-seq`,
//! `defmulti`, ... lower onto them) and are not meant to be typed by
//! users.

use crate::context::RuntimeContext;
use crate::namespace::CORE_NS;
use crate::value::{EvalResult, Value};
use crate::{
    arithmetic, io, list_ops, map_ops, misc_ops, multi_ops, ns_ops, predicates, random, ref_ops,
    regex_ops, seq_ops, set_ops, string_ops, walk_ops,
};
use tracing::debug;

type Builtin = fn(&mut RuntimeContext, &[Value]) -> EvalResult;

/// The full name -> implementation catalogue.
pub fn catalogue() -> Vec<(&'static str, Builtin)> {
    vec![
        // Arithmetic, equality, ordering
        ("+", arithmetic::add),
        ("-", arithmetic::subtract),
        ("*", arithmetic::multiply),
        ("/", arithmetic::divide),
        ("quot", arithmetic::quot),
        ("rem", arithmetic::rem),
        ("mod", arithmetic::modulo),
        ("inc", arithmetic::inc),
        ("dec", arithmetic::dec),
        ("abs", arithmetic::abs),
        ("max", arithmetic::max),
        ("min", arithmetic::min),
        ("int", arithmetic::to_int),
        ("double", arithmetic::to_double),
        ("=", arithmetic::eq),
        ("not=", arithmetic::not_eq),
        ("<", arithmetic::lt),
        ("<=", arithmetic::le),
        (">", arithmetic::gt),
        (">=", arithmetic::ge),
        ("compare", arithmetic::compare),
        ("even?", arithmetic::even_p),
        ("odd?", arithmetic::odd_p),
        ("pos?", arithmetic::pos_p),
        ("neg?", arithmetic::neg_p),
        ("zero?", arithmetic::zero_p),
        // Sequences
        ("seq", seq_ops::seq),
        ("first", seq_ops::first),
        ("rest", seq_ops::rest),
        ("next", seq_ops::next_op),
        ("second", seq_ops::second),
        ("ffirst", seq_ops::ffirst),
        ("nthrest", seq_ops::nthrest),
        ("nthnext", seq_ops::nthnext),
        ("last", seq_ops::last),
        ("butlast", seq_ops::butlast),
        ("count", seq_ops::count),
        ("empty?", seq_ops::empty_p),
        ("not-empty", seq_ops::not_empty),
        ("empty", seq_ops::empty),
        ("reverse", seq_ops::reverse),
        ("range", seq_ops::range),
        ("repeat", seq_ops::repeat),
        ("repeatedly", seq_ops::repeatedly),
        ("iterate", seq_ops::iterate),
        ("cycle", seq_ops::cycle),
        ("take", seq_ops::take),
        ("take-while", seq_ops::take_while),
        ("take-last", seq_ops::take_last),
        ("take-nth", seq_ops::take_nth),
        ("drop", seq_ops::drop),
        ("drop-while", seq_ops::drop_while),
        ("drop-last", seq_ops::drop_last),
        ("map", seq_ops::map_op),
        ("map-indexed", seq_ops::map_indexed),
        ("mapcat", seq_ops::mapcat),
        ("mapv", seq_ops::mapv),
        ("filterv", seq_ops::filterv),
        ("filter", seq_ops::filter_op),
        ("remove", seq_ops::remove_op),
        ("keep", seq_ops::keep),
        ("keep-indexed", seq_ops::keep_indexed),
        ("concat", seq_ops::concat),
        ("reduce", seq_ops::reduce),
        ("reduce-kv", seq_ops::reduce_kv),
        ("reductions", seq_ops::reductions),
        ("apply", seq_ops::apply),
        ("partial", seq_ops::partial),
        ("comp", seq_ops::comp),
        ("constantly", seq_ops::constantly),
        ("identity", seq_ops::identity),
        ("complement", seq_ops::complement),
        ("fnil", seq_ops::fnil),
        ("juxt", seq_ops::juxt),
        ("every-pred", seq_ops::every_pred),
        ("some-fn", seq_ops::some_fn),
        ("min-key", seq_ops::min_key),
        ("max-key", seq_ops::max_key),
        ("trampoline", seq_ops::trampoline),
        ("every?", seq_ops::every_p),
        ("not-every?", seq_ops::not_every_p),
        ("some", seq_ops::some),
        ("not-any?", seq_ops::not_any_p),
        ("sort", seq_ops::sort),
        ("sort-by", seq_ops::sort_by),
        ("group-by", seq_ops::group_by),
        ("frequencies", seq_ops::frequencies),
        ("partition", seq_ops::partition),
        ("partition-all", seq_ops::partition_all),
        ("partition-by", seq_ops::partition_by),
        ("split-at", seq_ops::split_at),
        ("split-with", seq_ops::split_with),
        ("interleave", seq_ops::interleave),
        ("interpose", seq_ops::interpose),
        ("distinct", seq_ops::distinct),
        ("dedupe", seq_ops::dedupe),
        ("flatten", seq_ops::flatten),
        ("tree-seq", seq_ops::tree_seq),
        ("into", seq_ops::into),
        ("doall", seq_ops::doall),
        ("dorun", seq_ops::dorun),
        ("__lazy-seq-create", seq_ops::lazy_seq_create),
        // Lists and vectors
        ("list", list_ops::list),
        ("list*", seq_ops::list_star),
        ("vector", list_ops::vector),
        ("vec", list_ops::vec),
        ("cons", list_ops::cons),
        ("conj", list_ops::conj),
        ("nth", list_ops::nth),
        ("subvec", list_ops::subvec),
        ("peek", list_ops::peek),
        ("pop", list_ops::pop),
        ("rseq", list_ops::rseq),
        // Maps
        ("hash-map", map_ops::hash_map),
        ("array-map", map_ops::hash_map),
        ("get", map_ops::get),
        ("assoc", map_ops::assoc),
        ("assoc-in", map_ops::assoc_in),
        ("update", map_ops::update),
        ("update-in", map_ops::update_in),
        ("dissoc", map_ops::dissoc),
        ("get-in", map_ops::get_in),
        ("find", map_ops::find),
        ("contains?", map_ops::contains_p),
        ("keys", map_ops::keys),
        ("vals", map_ops::vals),
        ("merge", map_ops::merge),
        ("merge-with", map_ops::merge_with),
        ("select-keys", map_ops::select_keys),
        ("update-keys", map_ops::update_keys),
        ("update-vals", map_ops::update_vals),
        ("zipmap", map_ops::zipmap),
        // Sets
        ("hash-set", set_ops::hash_set),
        ("set", set_ops::set),
        ("disj", set_ops::disj),
        ("union", set_ops::union),
        ("difference", set_ops::difference),
        ("intersection", set_ops::intersection),
        ("subset?", set_ops::subset_p),
        ("superset?", set_ops::superset_p),
        // Strings and identifiers
        ("str", string_ops::str_op),
        ("subs", string_ops::subs),
        ("upper-case", string_ops::upper_case),
        ("lower-case", string_ops::lower_case),
        ("capitalize", string_ops::capitalize),
        ("trim", string_ops::trim),
        ("triml", string_ops::triml),
        ("trimr", string_ops::trimr),
        ("blank?", string_ops::blank_p),
        ("split", string_ops::split),
        ("split-lines", string_ops::split_lines),
        ("join", string_ops::join),
        ("replace", string_ops::replace),
        ("replace-first", string_ops::replace_first),
        ("includes?", string_ops::includes_p),
        ("starts-with?", string_ops::starts_with_p),
        ("ends-with?", string_ops::ends_with_p),
        ("index-of", string_ops::index_of),
        ("last-index-of", string_ops::last_index_of),
        ("char", string_ops::char_op),
        ("name", string_ops::name),
        ("namespace", string_ops::namespace),
        ("symbol", string_ops::symbol),
        ("keyword", string_ops::keyword),
        ("gensym", string_ops::gensym),
        ("parse-long", string_ops::parse_long),
        ("parse-double", string_ops::parse_double),
        ("parse-boolean", string_ops::parse_boolean),
        ("format", string_ops::format),
        // Predicates
        ("nil?", predicates::nil_p),
        ("some?", predicates::some_p),
        ("true?", predicates::true_p),
        ("false?", predicates::false_p),
        ("not", predicates::not),
        ("boolean", predicates::boolean),
        ("boolean?", predicates::boolean_p),
        ("number?", predicates::number_p),
        ("int?", predicates::int_p),
        ("integer?", predicates::int_p),
        ("pos-int?", predicates::pos_int_p),
        ("neg-int?", predicates::neg_int_p),
        ("nat-int?", predicates::nat_int_p),
        ("float?", predicates::float_p),
        ("double?", predicates::float_p),
        ("string?", predicates::string_p),
        ("char?", predicates::char_p),
        ("keyword?", predicates::keyword_p),
        ("symbol?", predicates::symbol_p),
        ("ident?", predicates::ident_p),
        ("coll?", predicates::coll_p),
        ("list?", predicates::list_p),
        ("vector?", predicates::vector_p),
        ("map?", predicates::map_p),
        ("set?", predicates::set_p),
        ("seq?", predicates::seq_p),
        ("seqable?", predicates::seqable_p),
        ("sequential?", predicates::sequential_p),
        ("indexed?", predicates::indexed_p),
        ("associative?", predicates::associative_p),
        ("counted?", predicates::counted_p),
        ("fn?", predicates::fn_p),
        ("ifn?", predicates::ifn_p),
        ("var?", predicates::var_p),
        ("atom?", predicates::atom_p),
        ("volatile?", predicates::volatile_p),
        ("delay?", predicates::delay_p),
        ("reduced?", predicates::reduced_p),
        // Reference cells
        ("atom", ref_ops::atom),
        ("reset!", ref_ops::reset),
        ("reset-vals!", ref_ops::reset_vals),
        ("swap!", ref_ops::swap),
        ("swap-vals!", ref_ops::swap_vals),
        ("compare-and-set!", ref_ops::compare_and_set),
        ("set-validator!", ref_ops::set_validator),
        ("get-validator", ref_ops::get_validator),
        ("add-watch", ref_ops::add_watch),
        ("remove-watch", ref_ops::remove_watch),
        ("volatile!", ref_ops::volatile),
        ("vreset!", ref_ops::vreset),
        ("vswap!", ref_ops::vswap),
        ("__delay-create", ref_ops::delay_create),
        ("force", ref_ops::force),
        ("promise", ref_ops::promise),
        ("deliver", ref_ops::deliver),
        ("reduced", ref_ops::reduced),
        ("unreduced", ref_ops::unreduced),
        ("ensure-reduced", ref_ops::ensure_reduced),
        ("deref", ref_ops::deref),
        ("realized?", ref_ops::realized_p),
        // Walking
        ("walk", walk_ops::walk),
        ("postwalk", walk_ops::postwalk),
        ("prewalk", walk_ops::prewalk),
        ("postwalk-replace", walk_ops::postwalk_replace),
        ("prewalk-replace", walk_ops::prewalk_replace),
        // Printing
        ("pr", io::pr),
        ("prn", io::prn),
        ("print", io::print),
        ("println", io::println),
        ("newline", io::newline),
        ("printf", io::printf),
        ("flush", io::flush),
        ("pr-str", io::pr_str),
        ("prn-str", io::prn_str),
        ("print-str", io::print_str),
        ("println-str", io::println_str),
        ("slurp", io::slurp),
        ("spit", io::spit),
        // Randomness
        ("rand", random::rand),
        ("rand-int", random::rand_int),
        ("rand-nth", random::rand_nth),
        ("shuffle", random::shuffle),
        ("random-sample", random::random_sample),
        // Multimethods and protocols
        ("__defmulti", multi_ops::defmulti),
        ("__defmethod", multi_ops::defmethod),
        ("methods", multi_ops::methods),
        ("remove-method", multi_ops::remove_method),
        ("__defprotocol", multi_ops::defprotocol),
        ("__protocol-fn", multi_ops::protocol_fn),
        ("__fn-proto", multi_ops::fn_proto),
        ("__extend-type", multi_ops::extend_type),
        ("satisfies?", multi_ops::satisfies_p),
        ("extends?", multi_ops::extends_p),
        // Regex
        ("re-pattern", regex_ops::re_pattern),
        ("re-find", regex_ops::re_find),
        ("re-matches", regex_ops::re_matches),
        ("re-seq", regex_ops::re_seq),
        // Metadata, typing, hashing, error values
        ("meta", misc_ops::meta),
        ("with-meta", misc_ops::with_meta),
        ("vary-meta", misc_ops::vary_meta),
        ("type", misc_ops::type_op),
        ("class", misc_ops::type_op),
        ("hash", misc_ops::hash_op),
        ("hash-combine", misc_ops::hash_combine_op),
        ("hash-ordered-coll", misc_ops::hash_ordered_coll),
        ("hash-unordered-coll", misc_ops::hash_unordered_coll),
        ("mix-collection-hash", misc_ops::mix_collection_hash),
        ("ex-info", misc_ops::ex_info),
        ("ex-message", misc_ops::ex_message),
        ("ex-data", misc_ops::ex_data),
        // Namespaces and Vars
        ("find-ns", ns_ops::find_ns),
        ("create-ns", ns_ops::create_ns),
        ("remove-ns", ns_ops::remove_ns),
        ("all-ns", ns_ops::all_ns),
        ("ns-name", ns_ops::ns_name),
        ("ns-publics", ns_ops::ns_publics),
        ("ns-interns", ns_ops::ns_interns),
        ("ns-map", ns_ops::ns_map),
        ("ns-refers", ns_ops::ns_refers),
        ("ns-aliases", ns_ops::ns_aliases),
        ("ns-resolve", ns_ops::ns_resolve),
        ("resolve", ns_ops::resolve),
        ("ns-unmap", ns_ops::ns_unmap),
        ("ns-unalias", ns_ops::ns_unalias),
        ("intern", ns_ops::intern),
        ("refer", ns_ops::refer),
        ("alias", ns_ops::alias),
        ("in-ns", ns_ops::in_ns),
        ("require", ns_ops::require),
        ("use", ns_ops::use_op),
        ("load-file", ns_ops::load_file),
        ("loaded-libs", ns_ops::loaded_libs),
        ("push-thread-bindings", ns_ops::push_thread_bindings),
        ("pop-thread-bindings", ns_ops::pop_thread_bindings),
        ("with-bindings-fn", ns_ops::with_bindings_fn),
        ("with-redefs-fn", ns_ops::with_redefs_fn),
        ("var-get", ns_ops::var_get),
        ("var-set", ns_ops::var_set),
        ("alter-var-root", ns_ops::alter_var_root),
        ("find-var", ns_ops::find_var),
        ("bound?", ns_ops::bound_p),
        ("thread-bound?", ns_ops::thread_bound_p),
        ("__set-dynamic", ns_ops::set_dynamic),
        ("__set-private", ns_ops::set_private),
        ("__set-doc", ns_ops::set_doc),
    ]
}

/// Intern the whole catalogue into `clojure.core`.
pub fn install(ctx: &mut RuntimeContext) {
    let core = ctx.env.ensure_ns(CORE_NS);
    let entries = catalogue();
    let count = entries.len();
    for (name, f) in entries {
        core.intern_with_root(name, Value::native_fn(name, f));
    }
    debug!(count, "installed core builtins");
}
